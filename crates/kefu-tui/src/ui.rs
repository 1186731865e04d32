use chrono::{DateTime, Local, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use kefu_core::{Customer, Message, MessageKind, Provider, Sender};

use crate::app::{App, FocusPane, InputMode, Popup, EMOJIS};
use crate::input::{char_width, display_width, wrap_to_width};

/// Shown in the header, the operator's own display name
const OPERATOR_NAME: &str = "老李 (技术支持)";

const AVATAR_COLORS: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

const OUTGOING_BUBBLE: Style = Style::new().bg(Color::LightGreen).fg(Color::Black);
const INCOMING_BUBBLE: Style = Style::new().bg(Color::White).fg(Color::Black);

const SIDEBAR_WIDTH: u16 = 34;

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_rows: usize) {
    let visible_rows = visible_rows.max(1);
    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_rows - 1);
        let new_offset = state.offset().clamp(min_offset, selected);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Cut a string to a display width, adding an ellipsis when shortened
fn truncate_to_width(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = char_width(c);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn avatar_badge(customer: &Customer) -> Span<'static> {
    let color = AVATAR_COLORS[customer.avatar_index(AVATAR_COLORS.len())];
    Span::styled(
        format!(" {} ", customer.initial()),
        Style::default().bg(color).fg(Color::Black).add_modifier(Modifier::BOLD),
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_sidebar(app, frame, sidebar_area);
    if app.active().is_some() {
        render_chat(app, frame, chat_area);
    } else {
        render_placeholder(frame, chat_area);
    }
    render_footer(app, frame, footer_area);

    match app.popup {
        Some(Popup::AddCustomer) => render_text_popup(
            app,
            frame,
            area,
            " 添加客户 ",
            "输入客户称呼... Enter to add, Esc to cancel",
            false,
        ),
        Some(Popup::Rename) => render_text_popup(
            app,
            frame,
            area,
            " Rename Customer ",
            "Enter to save, Esc to cancel",
            false,
        ),
        Some(Popup::AttachImage) => render_text_popup(
            app,
            frame,
            area,
            " Send Image ",
            "Path to a png, jpeg or webp file. Enter to send.",
            false,
        ),
        Some(Popup::ApiKey(provider)) => {
            let title = format!(" Enter API Key for {} ", provider.display_name());
            render_text_popup(
                app,
                frame,
                area,
                &title,
                "Paste your API key below. Press Enter to save, Esc to cancel.",
                true,
            )
        }
        Some(Popup::Emoji) => render_emoji_picker(app, frame, area),
        Some(Popup::ModelPicker) => render_model_picker(app, frame, area),
        Some(Popup::ProviderPicker) => render_provider_picker(app, frame, area),
        None => {}
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let waiting = app
        .conversations
        .customers()
        .iter()
        .filter(|c| app.conversations.is_typing(&c.id))
        .count();
    let waiting_indicator = if waiting > 0 {
        format!(" [{} waiting]", waiting)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", OPERATOR_NAME), Style::default().fg(Color::Green).bold()),
        Span::styled(
            format!(" {}: {} ", app.current_provider.display_name(), app.selected_model),
            Style::default().fg(Color::White),
        ),
        Span::styled(waiting_indicator, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" 客户 ");

    // badge (3) + space, minus borders and highlight symbol
    let text_width = area.width.saturating_sub(2 + 2 + 4) as usize;

    let items: Vec<ListItem> = app
        .conversations
        .customers()
        .iter()
        .map(|c| {
            let time = c.last_message_time.as_ref().map(local_time).unwrap_or_default();
            let name_width = text_width.saturating_sub(time.len() + 1);
            let name = truncate_to_width(&c.name, name_width);
            let pad = text_width.saturating_sub(display_width(&name) + time.len());

            let mut name_line = vec![
                avatar_badge(c),
                Span::raw(" "),
                Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" ".repeat(pad)),
                Span::styled(time, Style::default().fg(Color::DarkGray)),
            ];
            if app.conversations.is_typing(&c.id) {
                name_line[3] = Span::raw(" ".repeat(pad.saturating_sub(2)));
                name_line.insert(4, Span::styled("… ", Style::default().fg(Color::Yellow)));
            }

            let preview = c.last_message.as_deref().unwrap_or("暂无消息");
            let preview = truncate_to_width(&preview.replace('\n', " "), text_width);
            let preview_line = Line::from(vec![
                Span::raw("    "),
                Span::styled(preview, Style::default().fg(Color::Gray)),
            ]);

            ListItem::new(Text::from(vec![Line::from(name_line), preview_line]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
        .highlight_symbol("▌ ");

    // Each customer takes two rows
    let visible = area.height.saturating_sub(2) as usize / 2;
    ensure_selected_visible(&mut app.sidebar_state, visible);

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_placeholder(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let text = Text::from(vec![Line::from("💬"), Line::from("选择一个客户开始聊天")])
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), middle);
}

/// Lay out one message as bubble lines. Outgoing messages sit on the right.
fn message_lines(msg: &Message, customer: &Customer, width: usize) -> Vec<Line<'static>> {
    let bubble_width = (width * 7 / 10).max(8);
    let (alignment, bubble_style) = match msg.sender {
        Sender::Me => (Alignment::Right, OUTGOING_BUBBLE),
        Sender::Other => (Alignment::Left, INCOMING_BUBBLE),
    };

    let mut lines = Vec::new();

    let time = local_time(&msg.timestamp);
    let meta = match msg.sender {
        Sender::Me => Line::from(vec![
            Span::styled(time, Style::default().fg(Color::DarkGray)),
            Span::raw(" "),
            Span::styled(" 我 ", OUTGOING_BUBBLE.add_modifier(Modifier::BOLD)),
        ]),
        Sender::Other => Line::from(vec![
            avatar_badge(customer),
            Span::raw(" "),
            Span::styled(customer.name.clone(), Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(time, Style::default().fg(Color::DarkGray)),
        ]),
    };
    lines.push(meta.alignment(alignment));

    let mut body: Vec<String> = Vec::new();
    if msg.kind == MessageKind::Image {
        let label = match &msg.image {
            Some(img) => format!("[图片] {} · {} KB", img.mime_type, img.byte_len().div_ceil(1024)),
            None => "[图片]".to_string(),
        };
        body.push(label);
    }
    if !msg.text.is_empty() || body.is_empty() {
        body.extend(wrap_to_width(&msg.text, bubble_width.saturating_sub(2)));
    }

    for line in body {
        let image_label = line.starts_with("[图片]") && msg.kind == MessageKind::Image;
        let style = if image_label {
            bubble_style.add_modifier(Modifier::ITALIC)
        } else {
            bubble_style
        };
        lines.push(Line::from(Span::styled(format!(" {} ", line), style)).alignment(alignment));
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(messages_area);

    let Some(customer) = app.active().cloned() else {
        return;
    };

    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };
    let title = if app.active_is_typing() {
        format!(" {} · 对方正在输入... ", customer.name)
    } else {
        format!(" {} ", customer.name)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)));

    let inner_width = messages_area.width.saturating_sub(2) as usize;
    let inner_height = messages_area.height.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.active_history() {
        lines.extend(message_lines(msg, &customer, inner_width));
    }

    if app.active_is_typing() {
        lines.push(Line::from(vec![avatar_badge(&customer)]));
        // Animated dots: cycles through one, two and three
        let dots = "● ".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!(" {}", dots),
            INCOMING_BUBBLE.fg(Color::DarkGray),
        )));
    }

    // Lines are pre-wrapped, so the count is exact
    let total = lines.len() as u16;
    app.chat_height = inner_height;
    app.chat_max_scroll = total.saturating_sub(inner_height);
    if app.follow_chat {
        app.chat_scroll = app.chat_max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, messages_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.popup.is_none();
    let border_color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" 发送 (Enter) ");

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_x) = scroll_window(app.active_draft(), app.input_cursor, inner_width);

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x as u16 + 1, area.y + 1));
    }
}

/// Horizontal scrolling for single-line input. Returns the visible slice of
/// `text` and the cursor column within it. Whole characters are skipped, so a
/// wide character is never cut in half.
fn scroll_window(text: &str, cursor: usize, width: usize) -> (String, usize) {
    let cursor_col: usize = text.chars().take(cursor).map(char_width).sum();
    let target = cursor_col.saturating_sub(width.saturating_sub(1));

    let mut skipped = 0;
    let mut used = 0;
    let mut visible = String::new();
    for c in text.chars() {
        let w = char_width(c);
        if skipped < target {
            skipped += w;
            continue;
        }
        if used + w > width {
            break;
        }
        visible.push(c);
        used += w;
    }

    (visible, cursor_col.saturating_sub(skipped))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(status) = &app.status {
        let line = Line::from(vec![
            Span::styled(" ! ", Style::default().bg(Color::Red).fg(Color::White)),
            Span::styled(format!(" {} ", status), label_style.fg(Color::LightRed)),
            Span::styled(" Esc ", key_style),
            Span::styled(" dismiss ", label_style),
        ]);
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(Color::Black)), area);
        return;
    }

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let pairs: &[(&str, &str)] = match (app.popup, app.input_mode) {
        (Some(p), _) if p.takes_text() => &[("Enter", "ok"), ("Esc", "cancel")],
        (Some(_), _) => &[("j/k", "nav"), ("Enter", "select"), ("Esc", "cancel")],
        (None, InputMode::Editing) => &[
            ("Enter", "send"),
            ("^E", "emoji"),
            ("^O", "image"),
            ("Esc", "stop typing"),
        ],
        (None, InputMode::Normal) => match app.focus {
            FocusPane::Chat => &[
                ("j/k", "scroll"),
                ("g/G", "top/bottom"),
                ("i", "type"),
                ("Tab", "focus"),
                ("q", "quit"),
            ],
            _ => &[
                ("j/k", "customer"),
                ("Enter", "type"),
                ("a", "add"),
                ("r", "rename"),
                ("o", "image"),
                ("e", "emoji"),
                ("P", "provider"),
                ("M", "model"),
                ("Tab", "focus"),
                ("q", "quit"),
            ],
        },
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_text_popup(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    title: &str,
    hint: &str,
    mask: bool,
) {
    let popup_area = centered(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title.to_string());
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let hint_area = Rect::new(inner.x, inner.y, inner.width, 1);
    frame.render_widget(
        Paragraph::new(hint.to_string()).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    // Mask keys with asterisks, keeping the last four characters
    let display_text = if mask {
        let count = app.popup_input.chars().count();
        if count <= 4 {
            "*".repeat(count)
        } else {
            let last_four: String = app.popup_input.chars().skip(count - 4).collect();
            format!("{}...{}", "*".repeat((count - 4).min(20)), last_four)
        }
    } else {
        app.popup_input.clone()
    };

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let cursor = if mask {
        display_text.chars().count()
    } else {
        app.popup_cursor
    };
    let (visible, cursor_x) = scroll_window(&display_text, cursor, input_area.width as usize);

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x as u16, input_area.y));

    if mask {
        let status_area = Rect::new(inner.x, inner.y + 4, inner.width, 1);
        frame.render_widget(
            Paragraph::new(format!("{} characters", app.popup_input.chars().count()))
                .style(Style::default().fg(Color::DarkGray)),
            status_area,
        );
    }
}

fn picker_list<'a>(items: Vec<ListItem<'a>>, title: &'a str) -> List<'a> {
    List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ")
}

fn render_emoji_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 24, EMOJIS.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = EMOJIS.iter().map(|e| ListItem::new(format!(" {} ", e))).collect();
    let list = picker_list(items, " Emoji ");

    ensure_selected_visible(&mut app.emoji_state, popup_area.height.saturating_sub(2) as usize);
    frame.render_stateful_widget(list, popup_area, &mut app.emoji_state);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 44, app.available_models.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();
    let list = picker_list(items, " Select Model (Enter to select, Esc to cancel) ");

    ensure_selected_visible(&mut app.model_picker_state, popup_area.height.saturating_sub(2) as usize);
    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup_area = centered(area, 48, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.key_source(*provider);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();
    let list = picker_list(items, " Select Provider ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}
