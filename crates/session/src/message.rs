use super::text::{RawText, to_safe_text};

/// Stable identifier for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

/// One finalized conversation entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
        }
    }
}

/// Append-only, ordered conversation log.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerces `raw` to display text and appends it at the tail.
    pub fn append(&mut self, sender: Sender, raw: impl Into<RawText>) -> MessageId {
        self.next_id = self.next_id.saturating_add(1);
        let id = MessageId::new(self.next_id);

        self.messages.push(Message::new(id, sender, to_safe_text(raw)));
        self.revision = self.revision.wrapping_add(1);
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Changes on every append; views compare it to decide when to refresh.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::text::UiElement;

    #[test]
    fn append_keeps_insertion_order_and_unique_ids() {
        let mut store = MessageStore::new();
        let first = store.append(Sender::User, "What is a fever?");
        let second = store.append(Sender::Bot, "A fever is...");

        assert!(first < second);
        assert_eq!(
            store.messages(),
            &[
                Message::new(first, Sender::User, "What is a fever?"),
                Message::new(second, Sender::Bot, "A fever is..."),
            ]
        );
        assert_eq!(store.last().map(|message| message.id), Some(second));
    }

    #[test]
    fn append_coerces_raw_values() {
        let mut store = MessageStore::new();
        store.append(Sender::Bot, json!({ "reply": 1 }));
        store.append(Sender::Bot, UiElement::new("Loader"));
        store.append(Sender::User, None::<String>);

        let texts = store
            .messages()
            .iter()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec![r#"{"reply":1}"#, "[React element]", ""]);
    }

    #[test]
    fn revision_moves_on_every_append() {
        let mut store = MessageStore::new();
        assert!(store.is_empty());
        let before = store.revision();

        store.append(Sender::User, "one");
        let after_first = store.revision();
        store.append(Sender::User, "two");

        assert_ne!(before, after_first);
        assert_ne!(after_first, store.revision());
        assert_eq!(store.len(), 2);
    }
}
