use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode, Popup};
use crate::input::Edit;
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_LINES: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if let Some(popup) = app.popup {
        handle_popup(app, popup, key).await;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

/// Cursor editing keys shared by the message box and text popups
fn edit_for_key(key: &KeyEvent) -> Option<Edit> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('a') => Some(Edit::Home),
            KeyCode::Char('e') => Some(Edit::End),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(c) => Some(Edit::Insert(c)),
        KeyCode::Backspace => Some(Edit::Backspace),
        KeyCode::Delete => Some(Edit::Delete),
        KeyCode::Left => Some(Edit::Left),
        KeyCode::Right => Some(Edit::Right),
        KeyCode::Home => Some(Edit::Home),
        KeyCode::End => Some(Edit::End),
        _ => None,
    }
}

async fn handle_popup(app: &mut App, popup: Popup, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_popup(),
        KeyCode::Enter => app.submit_popup().await,
        _ if popup.takes_text() => {
            if let Some(edit) = edit_for_key(&key) {
                app.edit_popup(edit);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.popup_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.popup_nav_up(),
        _ => {}
    }
}

fn start_editing(app: &mut App) {
    if app.active().is_some() {
        app.focus = FocusPane::Input;
        app.input_mode = InputMode::Editing;
        app.input_cursor = app.active_draft().chars().count();
    }
}

fn cycle_focus(app: &mut App) {
    match app.focus {
        FocusPane::Sidebar => app.focus = FocusPane::Chat,
        FocusPane::Chat => {
            app.focus = FocusPane::Input;
            start_editing(app);
        }
        FocusPane::Input => {
            app.focus = FocusPane::Sidebar;
            app.input_mode = InputMode::Normal;
        }
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let has_customer = app.active().is_some();

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Esc => app.status = None,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Chat => app.scroll_chat_down(1),
            _ => app.sidebar_next(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Chat => app.scroll_chat_up(1),
            _ => app.sidebar_prev(),
        },
        KeyCode::Char('g') if app.focus == FocusPane::Chat => app.scroll_chat_top(),
        KeyCode::Char('G') if app.focus == FocusPane::Chat => app.scroll_chat_bottom(),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),

        KeyCode::Tab => cycle_focus(app),
        KeyCode::Char('i') | KeyCode::Enter => start_editing(app),

        // Customers and attachments
        KeyCode::Char('a') => app.open_popup(Popup::AddCustomer),
        KeyCode::Char('r') if has_customer => app.open_popup(Popup::Rename),
        KeyCode::Char('o') if has_customer => app.open_popup(Popup::AttachImage),
        KeyCode::Char('e') if has_customer => app.open_popup(Popup::Emoji),

        // Provider and model
        KeyCode::Char('M') => app.open_model_picker().await,
        KeyCode::Char('P') => app.open_popup(Popup::ProviderPicker),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.send_draft();
        }
        KeyCode::Tab => cycle_focus(app),
        KeyCode::Char('o') if ctrl => app.open_popup(Popup::AttachImage),
        KeyCode::Char('e') if ctrl => app.open_popup(Popup::Emoji),
        _ => {
            if let Some(edit) = edit_for_key(&key) {
                app.edit_draft(edit);
            }
        }
    }
}

fn handle_paste(app: &mut App, text: String) {
    match app.popup {
        Some(popup) if popup.takes_text() => app.edit_popup(Edit::InsertStr(text)),
        Some(_) => {}
        None => {
            if app.active().is_some() {
                start_editing(app);
                app.edit_draft(Edit::InsertStr(text));
            }
        }
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.popup.is_some() {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;

    // Scroll whichever pane is under the pointer
    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(WHEEL_LINES);
            } else if in_sidebar {
                app.sidebar_next();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(WHEEL_LINES);
            } else if in_sidebar {
                app.sidebar_prev();
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if let (true, Some(area)) = (in_sidebar, app.sidebar_area) {
                // Rows inside the border, two per customer
                if y > area.y && y < area.y + area.height.saturating_sub(1) {
                    let idx = (y - area.y - 1) as usize / 2 + app.sidebar_state.offset();
                    app.focus = FocusPane::Sidebar;
                    app.input_mode = InputMode::Normal;
                    app.select_index(idx);
                }
            } else if in_chat {
                app.focus = FocusPane::Chat;
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kefu_core::{Config, Conversations, EchoClient, ReplyClient, Sender};
    use std::time::Duration;

    fn echo_app() -> App {
        let client = ReplyClient::Echo(EchoClient::new(Duration::ZERO));
        App::from_parts(Conversations::seeded(), Config::new(), Some(client), "echo".into())
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn click(column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    async fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_any_mode() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('i'))).await.unwrap();
        handle_event(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn q_types_while_editing() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);

        type_str(&mut app, "q钻").await;
        assert!(!app.should_quit);
        assert_eq!(app.active_draft(), "q钻");

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn enter_sends_the_draft() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('i'))).await.unwrap();
        type_str(&mut app, "好的").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        let history = app.conversations.history("c1");
        assert_eq!(history.last().map(|m| m.sender), Some(Sender::Me));
        assert_eq!(history.last().map(|m| m.text.as_str()), Some("好的"));
        assert_eq!(app.active_draft(), "");
    }

    #[tokio::test]
    async fn j_and_k_move_between_customers() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('j'))).await.unwrap();
        assert_eq!(app.active_customer.as_deref(), Some("c2"));
        handle_event(&mut app, key(KeyCode::Char('k'))).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('k'))).await.unwrap();
        assert_eq!(app.active_customer.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn tab_cycles_focus() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Chat);
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.input_mode, InputMode::Editing);
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Sidebar);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn add_customer_through_popup() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert_eq!(app.popup, Some(Popup::AddCustomer));

        type_str(&mut app, "赵经理").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(app.popup.is_none());
        assert_eq!(app.conversations.customers()[0].name, "赵经理");
    }

    #[tokio::test]
    async fn escape_cancels_popup() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        type_str(&mut app, "x").await;
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();

        assert!(app.popup.is_none());
        assert_eq!(app.conversations.customers().len(), 3);
    }

    #[tokio::test]
    async fn emoji_picker_navigates_and_inserts() {
        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Char('e'))).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('j'))).await.unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.active_draft(), "🤝");
    }

    #[tokio::test]
    async fn paste_goes_to_draft() {
        let mut app = echo_app();
        handle_event(&mut app, AppEvent::Paste("M6\n丝锥".into())).await.unwrap();
        assert_eq!(app.active_draft(), "M6 丝锥");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn click_selects_customer_row() {
        let mut app = echo_app();
        app.sidebar_area = Some(Rect::new(0, 1, 30, 20));

        // Border at row 1, customers at rows 2-3, 4-5, 6-7
        handle_event(&mut app, click(5, 6)).await.unwrap();
        assert_eq!(app.active_customer.as_deref(), Some("c3"));

        handle_event(&mut app, click(5, 1)).await.unwrap();
        assert_eq!(app.active_customer.as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn wheel_scrolls_chat_under_pointer() {
        let mut app = echo_app();
        app.chat_area = Some(Rect::new(30, 1, 50, 20));
        app.chat_max_scroll = 10;
        app.chat_scroll = 10;

        let wheel_up = AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 40,
            row: 5,
            modifiers: KeyModifiers::NONE,
        });
        handle_event(&mut app, wheel_up).await.unwrap();

        assert_eq!(app.chat_scroll, 7);
        assert!(!app.follow_chat);
    }
}
