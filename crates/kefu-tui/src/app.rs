use std::path::{Path, PathBuf};

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use kefu_core::{
    Config, Conversations, Customer, ImageAttachment, Message, Provider, ReplyClient,
    ReplyService, Sender, FALLBACK_REPLY,
};

use crate::input::{apply_edit, Edit};

pub const EMOJIS: [&str; 11] = [
    "👍", "🤝", "👌", "🙏", "😂", "😊", "🤔", "📦", "🏭", "🔧", "🔩",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Chat,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    AddCustomer,
    Rename,
    AttachImage,
    Emoji,
    ModelPicker,
    ProviderPicker,
    ApiKey(Provider),
}

impl Popup {
    /// Popups that take typed text (as opposed to picking from a list)
    pub fn takes_text(&self) -> bool {
        matches!(
            self,
            Popup::AddCustomer | Popup::Rename | Popup::AttachImage | Popup::ApiKey(_)
        )
    }
}

/// A reply being generated for a customer
pub struct PendingReply {
    pub customer_id: String,
    handle: JoinHandle<String>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub popup: Option<Popup>,
    pub status: Option<String>,

    // Conversations
    pub conversations: Conversations,
    pub active_customer: Option<String>,
    pub sidebar_state: ListState,
    pub input_cursor: usize, // cursor position in the active draft

    // Popup state
    pub popup_input: String,
    pub popup_cursor: usize,
    pub emoji_state: ListState,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,
    pub provider_picker_state: ListState,

    // Chat view state (height and max scroll are updated during render)
    pub chat_scroll: u16,
    pub chat_max_scroll: u16,
    pub chat_height: u16,
    pub follow_chat: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing dots

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Provider state
    pub config: Config,
    config_path: Option<PathBuf>,
    pub current_provider: Provider,
    pub selected_model: String,
    pub client: Option<ReplyClient>,
    pending_replies: Vec<PendingReply>,
}

impl App {
    /// Build the app from config. CLI overrides take precedence over the file.
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        provider_override: Option<Provider>,
        model_override: Option<String>,
    ) -> Self {
        let provider = provider_override.unwrap_or_else(|| config.provider());

        let selected_model = model_override
            .or_else(|| {
                // A saved model only applies to the provider it was saved for
                if provider == config.provider() {
                    config.default_model.clone()
                } else {
                    None
                }
            })
            .unwrap_or_else(|| provider.default_model());

        let client = match ReplyClient::from_config(provider, &config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(provider = provider.as_str(), error = %e, "provider not ready");
                None
            }
        };

        let mut app = Self::from_parts(Conversations::seeded(), config, client, selected_model);
        app.current_provider = provider;
        app.config_path = config_path;
        if app.client.is_none() {
            app.status = Some(format!(
                "{} API key not configured. Press 'P' to set up.",
                provider.display_name()
            ));
        }
        app
    }

    /// Assemble an app around an existing store and client. The config is
    /// never written back.
    pub fn from_parts(
        conversations: Conversations,
        config: Config,
        client: Option<ReplyClient>,
        selected_model: String,
    ) -> Self {
        let current_provider = client
            .as_ref()
            .map(ReplyClient::provider)
            .unwrap_or_else(|| config.provider());

        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Sidebar,
            popup: None,
            status: None,

            conversations,
            active_customer: None,
            sidebar_state: ListState::default(),
            input_cursor: 0,

            popup_input: String::new(),
            popup_cursor: 0,
            emoji_state: ListState::default(),
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            provider_picker_state: ListState::default(),

            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_height: 0,
            follow_chat: true,

            animation_frame: 0,

            sidebar_area: None,
            chat_area: None,

            config,
            config_path: None,
            current_provider,
            selected_model,
            client,
            pending_replies: Vec::new(),
        };

        if let Some(first) = app.conversations.customers().first().map(|c| c.id.clone()) {
            app.select_customer(&first);
        }
        app
    }

    // Customer selection
    pub fn active(&self) -> Option<&Customer> {
        self.active_customer
            .as_deref()
            .and_then(|id| self.conversations.customer(id))
    }

    pub fn active_history(&self) -> &[Message] {
        self.active_customer
            .as_deref()
            .map(|id| self.conversations.history(id))
            .unwrap_or(&[])
    }

    pub fn active_draft(&self) -> &str {
        self.active_customer
            .as_deref()
            .map(|id| self.conversations.draft(id))
            .unwrap_or("")
    }

    pub fn active_is_typing(&self) -> bool {
        self.active_customer
            .as_deref()
            .map(|id| self.conversations.is_typing(id))
            .unwrap_or(false)
    }

    pub fn select_customer(&mut self, id: &str) {
        let Some(idx) = self.conversations.position(id) else {
            return;
        };
        self.sidebar_state.select(Some(idx));

        if self.active_customer.as_deref() != Some(id) {
            self.active_customer = Some(id.to_string());
            self.input_cursor = self.conversations.draft(id).chars().count();
            self.chat_scroll = 0;
            self.follow_chat = true;
        }
    }

    pub fn sidebar_next(&mut self) {
        let len = self.conversations.customers().len();
        if len > 0 {
            let i = self.sidebar_state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
            self.select_index(i);
        }
    }

    pub fn sidebar_prev(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0).saturating_sub(1);
        self.select_index(i);
    }

    pub fn select_index(&mut self, idx: usize) {
        if let Some(id) = self.conversations.customers().get(idx).map(|c| c.id.clone()) {
            self.select_customer(&id);
        }
    }

    // Draft editing
    pub fn edit_draft(&mut self, edit: Edit) {
        if let Some(id) = self.active_customer.clone() {
            apply_edit(self.conversations.draft_mut(&id), &mut self.input_cursor, edit);
        }
    }

    pub fn insert_emoji(&mut self, idx: usize) {
        if let (Some(id), Some(emoji)) = (self.active_customer.clone(), EMOJIS.get(idx)) {
            self.conversations.push_to_draft(&id, emoji);
            self.input_cursor = self.conversations.draft(&id).chars().count();
        }
    }

    // Sending
    fn reply_service(&self) -> Option<ReplyService> {
        let client = self.client.clone()?;
        let mut service = ReplyService::new(client, self.selected_model.clone())
            .with_history_window(self.config.history_window());
        if let Some(prompt) = &self.config.system_prompt {
            service = service.with_system_prompt(prompt.clone());
        }
        Some(service)
    }

    /// Send the active customer's draft
    pub fn send_draft(&mut self) -> bool {
        let draft = self.active_draft().to_string();
        self.send_message(&draft, None)
    }

    /// Append an outgoing message to the active conversation and start
    /// generating the reply. Returns false when nothing was sent.
    pub fn send_message(&mut self, text: &str, image: Option<ImageAttachment>) -> bool {
        let Some(customer_id) = self.active_customer.clone() else {
            return false;
        };
        if text.trim().is_empty() && image.is_none() {
            return false;
        }
        let Some(service) = self.reply_service() else {
            self.status = Some(format!(
                "{} API key not configured. Press 'P' to set up.",
                self.current_provider.display_name()
            ));
            return false;
        };

        // The reply is generated from the conversation as it was before this turn
        let history = self.conversations.history(&customer_id).to_vec();
        let message = match &image {
            Some(img) => Message::image(Sender::Me, text, img.clone()),
            None => Message::text(Sender::Me, text),
        };
        if let Err(e) = self.conversations.append(&customer_id, message) {
            error!(error = %e, "failed to append outgoing message");
            self.status = Some(e.to_string());
            return false;
        }

        self.conversations.clear_draft(&customer_id);
        self.input_cursor = 0;
        self.conversations.set_typing(&customer_id, true);
        self.follow_chat = true;
        self.status = None;

        info!(customer = %customer_id, has_image = image.is_some(), "message sent");

        let text = text.to_string();
        let handle = tokio::spawn(async move {
            service.generate_reply(&history, &text, image.as_ref()).await
        });
        self.pending_replies.push(PendingReply { customer_id, handle });
        true
    }

    /// Load an image from disk and send it on its own.
    pub fn attach_image(&mut self, path: &str) -> bool {
        let path = path.trim();
        let expanded = match path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| PathBuf::from(path)),
            None => PathBuf::from(path),
        };

        match ImageAttachment::from_path(&expanded) {
            Ok(image) => self.send_message("", Some(image)),
            Err(e) => {
                warn!(path = %expanded.display(), error = %e, "could not attach image");
                self.status = Some(format!("Could not attach image: {}", e));
                false
            }
        }
    }

    pub fn has_pending_replies(&self) -> bool {
        !self.pending_replies.is_empty()
    }

    /// Append the replies whose generation has finished.
    pub async fn poll_replies(&mut self) {
        let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_replies)
            .into_iter()
            .partition(|p| p.handle.is_finished());
        self.pending_replies = pending;

        for PendingReply { customer_id, handle } in finished {
            let text = match handle.await {
                Ok(text) => text,
                Err(e) => {
                    error!(customer = %customer_id, error = %e, "reply task failed");
                    FALLBACK_REPLY.to_string()
                }
            };
            self.append_reply(&customer_id, text);
        }
    }

    fn append_reply(&mut self, customer_id: &str, text: String) {
        let still_waiting = self
            .pending_replies
            .iter()
            .any(|p| p.customer_id == customer_id);
        self.conversations.set_typing(customer_id, still_waiting);

        if let Err(e) = self
            .conversations
            .append(customer_id, Message::text(Sender::Other, text))
        {
            warn!(error = %e, "dropping reply");
            return;
        }

        if self.active_customer.as_deref() == Some(customer_id) {
            self.follow_chat = true;
        }
    }

    // Customer management
    pub fn add_customer(&mut self, name: &str) -> bool {
        match self.conversations.add_customer(name) {
            Ok(id) => {
                info!(customer = %id, "customer added");
                self.select_customer(&id);
                true
            }
            Err(e) => {
                self.status = Some(e.to_string());
                false
            }
        }
    }

    pub fn rename_active(&mut self, name: &str) -> bool {
        let Some(id) = self.active_customer.clone() else {
            return false;
        };
        match self.conversations.rename_customer(&id, name) {
            Ok(changed) => changed,
            Err(e) => {
                self.status = Some(e.to_string());
                false
            }
        }
    }

    // Popups
    pub fn open_popup(&mut self, popup: Popup) {
        self.popup_input = match popup {
            Popup::Rename => self.active().map(|c| c.name.clone()).unwrap_or_default(),
            _ => String::new(),
        };
        self.popup_cursor = self.popup_input.chars().count();

        match popup {
            Popup::Emoji => self.emoji_state.select(Some(0)),
            Popup::ProviderPicker => {
                let current_idx = Provider::all()
                    .iter()
                    .position(|p| *p == self.current_provider)
                    .unwrap_or(0);
                self.provider_picker_state.select(Some(current_idx));
            }
            _ => {}
        }
        self.popup = Some(popup);
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
        self.popup_input.clear();
        self.popup_cursor = 0;
    }

    pub fn edit_popup(&mut self, edit: Edit) {
        apply_edit(&mut self.popup_input, &mut self.popup_cursor, edit);
    }

    /// Confirm the open popup
    pub async fn submit_popup(&mut self) {
        let Some(popup) = self.popup else {
            return;
        };
        let input = self.popup_input.clone();
        self.close_popup();

        match popup {
            Popup::AddCustomer => {
                if !input.trim().is_empty() {
                    self.add_customer(&input);
                }
            }
            Popup::Rename => {
                self.rename_active(&input);
            }
            Popup::AttachImage => {
                if !input.trim().is_empty() {
                    self.attach_image(&input);
                }
            }
            Popup::Emoji => {
                if let Some(i) = self.emoji_state.selected() {
                    self.insert_emoji(i);
                }
            }
            Popup::ModelPicker => self.select_model(),
            Popup::ProviderPicker => {
                if let Some(provider) = self
                    .provider_picker_state
                    .selected()
                    .and_then(|i| Provider::all().get(i).copied())
                {
                    self.switch_provider(provider).await;
                }
            }
            Popup::ApiKey(provider) => {
                let key = input.trim();
                if !key.is_empty() {
                    self.config.set_api_key(provider, key);
                    self.switch_provider(provider).await;
                }
            }
        }
    }

    // Model picker methods
    pub async fn open_model_picker(&mut self) {
        let models = match &self.client {
            Some(client) => client.list_models().await,
            None => self.current_provider.static_models(),
        };
        self.available_models = models;
        if self.available_models.is_empty() {
            self.status = Some(format!("No models available for {}", self.current_provider.display_name()));
            return;
        }

        // Select current model if in list, otherwise first
        let current_idx = self
            .available_models
            .iter()
            .position(|m| m == &self.selected_model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.open_popup(Popup::ModelPicker);
    }

    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
        {
            self.selected_model = model.clone();
            self.config.default_model = Some(self.selected_model.clone());
            self.save_config();
        }
    }

    /// Switch provider, asking for an API key first when one is missing.
    pub async fn switch_provider(&mut self, provider: Provider) {
        let client = match ReplyClient::from_config(provider, &self.config) {
            Ok(client) => client,
            Err(_) => {
                self.open_popup(Popup::ApiKey(provider));
                return;
            }
        };

        let models = client.list_models().await;
        self.selected_model = models
            .into_iter()
            .next()
            .unwrap_or_else(|| provider.default_model());
        self.client = Some(client);
        self.current_provider = provider;
        self.status = None;

        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = Some(self.selected_model.clone());
        self.save_config();
        info!(provider = provider.as_str(), model = %self.selected_model, "provider switched");
    }

    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        self.config.key_source(provider)
    }

    fn save_config(&self) {
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(path = %path.display(), error = %e, "failed to save config");
            }
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    // List navigation shared by the pickers
    pub fn list_down(state: &mut ListState, len: usize) {
        if len > 0 {
            let i = state.selected().unwrap_or(0);
            state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn list_up(state: &mut ListState) {
        let i = state.selected().unwrap_or(0);
        state.select(Some(i.saturating_sub(1)));
    }

    pub fn popup_nav_down(&mut self) {
        match self.popup {
            Some(Popup::Emoji) => Self::list_down(&mut self.emoji_state, EMOJIS.len()),
            Some(Popup::ModelPicker) => {
                Self::list_down(&mut self.model_picker_state, self.available_models.len())
            }
            Some(Popup::ProviderPicker) => {
                Self::list_down(&mut self.provider_picker_state, Provider::all().len())
            }
            _ => {}
        }
    }

    pub fn popup_nav_up(&mut self) {
        match self.popup {
            Some(Popup::Emoji) => Self::list_up(&mut self.emoji_state),
            Some(Popup::ModelPicker) => Self::list_up(&mut self.model_picker_state),
            Some(Popup::ProviderPicker) => Self::list_up(&mut self.provider_picker_state),
            _ => {}
        }
    }

    // Chat scrolling
    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
        self.follow_chat = self.chat_scroll >= self.chat_max_scroll;
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.chat_max_scroll).saturating_sub(lines);
        self.follow_chat = false;
    }

    pub fn scroll_chat_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_chat = false;
    }

    pub fn scroll_chat_bottom(&mut self) {
        self.chat_scroll = self.chat_max_scroll;
        self.follow_chat = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversations.any_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kefu_core::{EchoClient, MessageKind, OllamaClient};
    use std::time::Duration;

    fn echo_app() -> App {
        let client = ReplyClient::Echo(EchoClient::new(Duration::ZERO));
        App::from_parts(Conversations::seeded(), Config::new(), Some(client), "echo".into())
    }

    async fn settle(app: &mut App) {
        for _ in 0..500 {
            if !app.has_pending_replies() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.poll_replies().await;
        }
        panic!("replies never arrived");
    }

    fn preview_matches_last(app: &App, id: &str) -> bool {
        let customer = app.conversations.customer(id).unwrap();
        let last = app.conversations.history(id).last().unwrap();
        customer.last_message.as_deref() == Some(last.preview())
    }

    #[test]
    fn starts_on_first_customer() {
        let app = echo_app();
        assert_eq!(app.active_customer.as_deref(), Some("c1"));
        assert_eq!(app.sidebar_state.selected(), Some(0));
        assert_eq!(app.current_provider, Provider::Echo);
    }

    #[tokio::test]
    async fn send_appends_one_outgoing_then_one_incoming() {
        let mut app = echo_app();
        app.conversations.set_draft("c1", "有货，M6的要多少？");

        assert!(app.send_draft());
        let history = app.conversations.history("c1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sender, Sender::Me);
        assert_eq!(history[1].text, "有货，M6的要多少？");
        assert!(app.conversations.is_typing("c1"));
        assert_eq!(app.active_draft(), "");
        assert!(preview_matches_last(&app, "c1"));

        settle(&mut app).await;

        let history = app.conversations.history("c1");
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].sender, Sender::Other);
        assert_eq!(history[2].kind, MessageKind::Text);
        assert_eq!(history[2].text, "[echo] 有货，M6的要多少？");
        assert!(!app.conversations.is_typing("c1"));
        assert!(preview_matches_last(&app, "c1"));
    }

    #[tokio::test]
    async fn failed_reply_appends_fallback_and_clears_typing() {
        let client = ReplyClient::Ollama(OllamaClient::new("http://127.0.0.1:9"));
        let mut app = App::from_parts(Conversations::seeded(), Config::new(), Some(client), "gemma3".into());

        assert!(app.send_message("在吗", None));
        settle(&mut app).await;

        let last = app.conversations.history("c1").last().unwrap();
        assert_eq!(last.sender, Sender::Other);
        assert_eq!(last.text, FALLBACK_REPLY);
        assert!(!app.conversations.is_typing("c1"));
        assert!(preview_matches_last(&app, "c1"));
    }

    #[tokio::test]
    async fn reply_lands_with_the_customer_it_was_sent_to() {
        let mut app = echo_app();
        assert!(app.send_message("M8丝锥", None));

        // switch away before the reply arrives
        app.select_customer("c2");
        settle(&mut app).await;

        assert_eq!(app.conversations.history("c1").len(), 3);
        assert_eq!(app.conversations.history("c2").len(), 1);
        assert_eq!(app.active_customer.as_deref(), Some("c2"));
    }

    #[test]
    fn blank_send_is_ignored() {
        let mut app = echo_app();
        assert!(!app.send_message("   ", None));
        assert_eq!(app.conversations.history("c1").len(), 1);
        assert!(!app.has_pending_replies());
    }

    #[test]
    fn send_without_client_keeps_the_draft() {
        let mut app = App::from_parts(Conversations::seeded(), Config::new(), None, "m".into());
        app.conversations.set_draft("c1", "hello");

        assert!(!app.send_draft());
        assert_eq!(app.active_draft(), "hello");
        assert_eq!(app.conversations.history("c1").len(), 1);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn image_send_previews_as_placeholder() {
        let mut app = echo_app();
        let img = ImageAttachment::from_data_url("data:image/png;base64,AAAA");
        assert!(app.send_message("", Some(img)));

        let customer = app.conversations.customer("c1").unwrap();
        assert_eq!(customer.last_message.as_deref(), Some(kefu_core::model::IMAGE_PREVIEW));

        settle(&mut app).await;
        let last = app.conversations.history("c1").last().unwrap();
        assert!(last.text.contains("image/png"));
    }

    #[test]
    fn attaching_a_missing_file_sends_nothing() {
        let mut app = echo_app();
        assert!(!app.attach_image("/definitely/not/here.png"));
        assert_eq!(app.conversations.history("c1").len(), 1);
        assert!(app.status.as_deref().unwrap().contains("Could not attach image"));
    }

    #[test]
    fn drafts_follow_the_active_customer() {
        let mut app = echo_app();
        app.edit_draft(Edit::InsertStr("滚花".into()));
        app.select_customer("c2");
        assert_eq!(app.active_draft(), "");
        assert_eq!(app.input_cursor, 0);

        app.select_customer("c1");
        assert_eq!(app.active_draft(), "滚花");
        assert_eq!(app.input_cursor, 2);
    }

    #[test]
    fn add_customer_activates_it() {
        let mut app = echo_app();
        assert!(app.add_customer("赵工"));
        assert_eq!(app.sidebar_state.selected(), Some(0));
        assert_eq!(app.active().unwrap().name, "赵工");
        assert!(app.active_history().is_empty());

        assert!(!app.add_customer("  "));
        assert_eq!(app.conversations.customers().len(), 4);
    }

    #[tokio::test]
    async fn rename_popup_prefills_and_applies() {
        let mut app = echo_app();
        app.open_popup(Popup::Rename);
        assert_eq!(app.popup_input, "王总 (宏达机械)");

        app.edit_popup(Edit::Home);
        app.edit_popup(Edit::InsertStr("老".into()));
        app.submit_popup().await;

        assert!(app.popup.is_none());
        assert_eq!(app.active().unwrap().name, "老王总 (宏达机械)");
    }

    #[tokio::test]
    async fn emoji_goes_to_the_end_of_the_draft() {
        let mut app = echo_app();
        app.conversations.set_draft("c1", "好的");
        app.open_popup(Popup::Emoji);
        app.popup_nav_down();
        app.submit_popup().await;
        assert_eq!(app.active_draft(), "好的🤝");
    }

    #[test]
    fn sidebar_navigation_is_clamped() {
        let mut app = echo_app();
        app.sidebar_prev();
        assert_eq!(app.active_customer.as_deref(), Some("c1"));
        app.sidebar_next();
        app.sidebar_next();
        app.sidebar_next();
        assert_eq!(app.active_customer.as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn switching_to_keyless_provider() {
        let mut app = App::from_parts(Conversations::seeded(), Config::new(), None, "m".into());
        app.switch_provider(Provider::Echo).await;
        assert_eq!(app.current_provider, Provider::Echo);
        assert_eq!(app.selected_model, "echo");
        assert!(app.client.is_some());
        // no config path, nothing written
        assert!(app.config_path().is_none());
    }

    #[tokio::test]
    async fn switching_without_a_key_asks_for_one() {
        let saved = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let mut app = echo_app();
        app.switch_provider(Provider::OpenAI).await;

        let popup = app.popup;
        let provider = app.current_provider;
        let has_client = app.client.is_some();
        if let Some(value) = saved {
            std::env::set_var("OPENAI_API_KEY", value);
        }

        assert_eq!(popup, Some(Popup::ApiKey(Provider::OpenAI)));
        assert_eq!(provider, Provider::Echo);
        assert!(has_client);
    }

    #[tokio::test]
    async fn entering_a_key_completes_the_switch() {
        let mut app = echo_app();
        app.open_popup(Popup::ApiKey(Provider::OpenAI));
        app.edit_popup(Edit::InsertStr("sk-test".into()));
        app.submit_popup().await;

        assert!(app.popup.is_none());
        assert_eq!(app.current_provider, Provider::OpenAI);
        assert_eq!(app.config.openai_api_key.as_deref(), Some("sk-test"));
    }
}
