//! In-memory conversation store
//!
//! Holds the customer list, each customer's append-only message history and
//! the transient per-customer UI state (draft text, typing indicator).
//! Nothing here is persisted.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::model::{Customer, Message, Sender};

#[derive(Debug, Default)]
pub struct Conversations {
    customers: Vec<Customer>,
    histories: HashMap<String, Vec<Message>>,
    drafts: HashMap<String, String>,
    typing: HashSet<String>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with three long-standing customers
    pub fn seeded() -> Self {
        let now = Utc::now();
        let seeds = [
            ("c1", "王总 (宏达机械)", "101", "老李，上次那个M6的丝锥还有货吗？", Duration::hours(1)),
            ("c2", "张工 (精密模具)", "202", "滚花轮纹路有点浅，怎么调？", Duration::days(1)),
            ("c3", "李老板 (五金加工)", "303", "收到货了，质量不错。", Duration::days(2)),
        ];

        let mut store = Self::new();
        for (id, name, seed, text, age) in seeds {
            let message = Message::text(Sender::Other, text).at(now - age);
            store.customers.push(Customer {
                id: id.to_string(),
                name: name.to_string(),
                avatar_seed: seed.to_string(),
                last_message: Some(message.preview().to_string()),
                last_message_time: Some(message.timestamp),
            });
            store.histories.insert(id.to_string(), vec![message]);
        }
        store
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.customers.iter().position(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.histories.contains_key(id)
    }

    /// Messages for a customer in arrival order (empty for unknown ids)
    pub fn history(&self, id: &str) -> &[Message] {
        self.histories.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a customer at the top of the list and return its id.
    pub fn add_customer(&mut self, name: &str) -> CoreResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }

        let customer = Customer::new(name);
        let id = customer.id.clone();
        self.histories.insert(id.clone(), Vec::new());
        self.customers.insert(0, customer);
        Ok(id)
    }

    /// Rename a customer. Blank or unchanged names leave it untouched.
    /// Returns whether the name changed.
    pub fn rename_customer(&mut self, id: &str, name: &str) -> CoreResult<bool> {
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::UnknownCustomer(id.to_string()))?;

        let name = name.trim();
        if name.is_empty() || name == customer.name {
            return Ok(false);
        }
        customer.name = name.to_string();
        Ok(true)
    }

    /// Append a message and refresh the customer's preview.
    pub fn append(&mut self, id: &str, message: Message) -> CoreResult<()> {
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::UnknownCustomer(id.to_string()))?;

        customer.last_message = Some(message.preview().to_string());
        customer.last_message_time = Some(message.timestamp);

        self.histories.entry(id.to_string()).or_default().push(message);
        Ok(())
    }

    pub fn draft(&self, id: &str) -> &str {
        self.drafts.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn draft_mut(&mut self, id: &str) -> &mut String {
        self.drafts.entry(id.to_string()).or_default()
    }

    pub fn set_draft(&mut self, id: &str, text: impl Into<String>) {
        self.drafts.insert(id.to_string(), text.into());
    }

    pub fn clear_draft(&mut self, id: &str) {
        self.drafts.remove(id);
    }

    /// Append text (an emoji, usually) to the end of a draft
    pub fn push_to_draft(&mut self, id: &str, text: &str) {
        self.draft_mut(id).push_str(text);
    }

    pub fn is_typing(&self, id: &str) -> bool {
        self.typing.contains(id)
    }

    pub fn set_typing(&mut self, id: &str, typing: bool) {
        if typing {
            self.typing.insert(id.to_string());
        } else {
            self.typing.remove(id);
        }
    }

    pub fn any_typing(&self) -> bool {
        !self.typing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAttachment, IMAGE_PREVIEW, NEW_CUSTOMER_PREVIEW};

    fn preview_matches_last(store: &Conversations, id: &str) -> bool {
        let customer = store.customer(id).unwrap();
        let last = store.history(id).last().unwrap();
        customer.last_message.as_deref() == Some(last.preview())
            && customer.last_message_time == Some(last.timestamp)
    }

    #[test]
    fn seeded_store_has_three_customers_with_previews() {
        let store = Conversations::seeded();
        assert_eq!(store.customers().len(), 3);
        assert_eq!(store.customers()[0].id, "c1");
        for c in store.customers() {
            assert_eq!(store.history(&c.id).len(), 1);
            assert!(preview_matches_last(&store, &c.id));
        }
    }

    #[test]
    fn append_refreshes_preview() {
        let mut store = Conversations::seeded();
        store.append("c2", Message::text(Sender::Me, "进给降一点试试")).unwrap();
        assert!(preview_matches_last(&store, "c2"));
        assert_eq!(store.history("c2").len(), 2);

        let img = ImageAttachment::from_data_url("data:image/png;base64,AAAA");
        store.append("c2", Message::image(Sender::Me, "", img)).unwrap();
        assert_eq!(store.customer("c2").unwrap().last_message.as_deref(), Some(IMAGE_PREVIEW));
        assert!(preview_matches_last(&store, "c2"));

        // other customers untouched
        assert_eq!(store.history("c1").len(), 1);
    }

    #[test]
    fn append_to_unknown_customer_fails() {
        let mut store = Conversations::new();
        let err = store.append("nobody", Message::text(Sender::Me, "hi")).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCustomer(id) if id == "nobody"));
    }

    #[test]
    fn add_customer_goes_to_front_with_empty_history() {
        let mut store = Conversations::seeded();
        let id = store.add_customer("  赵工 (模具厂)  ").unwrap();

        assert_eq!(store.customers()[0].id, id);
        assert_eq!(store.customers()[0].name, "赵工 (模具厂)");
        assert_eq!(store.customers()[0].last_message.as_deref(), Some(NEW_CUSTOMER_PREVIEW));
        assert!(store.contains(&id));
        assert!(store.history(&id).is_empty());
    }

    #[test]
    fn add_customer_rejects_blank_name() {
        let mut store = Conversations::new();
        assert!(matches!(store.add_customer("   "), Err(CoreError::EmptyName)));
        assert!(store.customers().is_empty());
    }

    #[test]
    fn rename_ignores_blank_and_unchanged() {
        let mut store = Conversations::seeded();
        assert!(!store.rename_customer("c1", "  ").unwrap());
        assert!(!store.rename_customer("c1", "王总 (宏达机械)").unwrap());
        assert!(store.rename_customer("c1", " 王总 ").unwrap());
        assert_eq!(store.customer("c1").unwrap().name, "王总");
        assert!(store.rename_customer("zz", "x").is_err());
    }

    #[test]
    fn drafts_and_typing_are_per_customer() {
        let mut store = Conversations::seeded();
        store.set_draft("c1", "M6");
        store.push_to_draft("c1", "👍");
        store.set_typing("c2", true);

        assert_eq!(store.draft("c1"), "M6👍");
        assert_eq!(store.draft("c2"), "");
        assert!(store.is_typing("c2"));
        assert!(!store.is_typing("c1"));

        store.clear_draft("c1");
        store.set_typing("c2", false);
        assert_eq!(store.draft("c1"), "");
        assert!(!store.any_typing());
    }
}
