use std::collections::HashMap;

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// An ordinary user message. Only these can originate reply edges.
    Regular,
    /// Pins, joins, title changes and similar service records. Kept because
    /// they can still be the *target* of a reply.
    Service,
}

#[derive(Clone, Debug)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

/// A normalized export record. Built once by the loader, never mutated.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: i64,
    pub kind: MessageKind,
    pub date: DateTime<Utc>,
    pub from: Option<String>,
    pub reply_to: Option<i64>,
    pub text: String,
    pub reactions: Vec<Reaction>,
    pub has_media: bool,
}

impl Message {
    pub fn reaction_total(&self) -> u32 {
        self.reactions
            .iter()
            .fold(0u32, |sum, reaction| sum.saturating_add(reaction.count))
    }
}

#[derive(Clone, Debug)]
pub struct ChatExport {
    pub name: String,
    pub messages: Vec<Message>,
}

impl ChatExport {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Index messages by id for O(1) reply-target resolution. Export ids are
/// expected unique; if a duplicate sneaks in, the last record wins.
pub fn build_index(messages: &[Message]) -> HashMap<i64, &Message> {
    let mut index = HashMap::with_capacity(messages.len());
    for message in messages {
        index.insert(message.id, message);
    }
    index
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn message(id: i64, reply_to: Option<i64>) -> Message {
        Message {
            id,
            kind: MessageKind::Regular,
            date: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
            from: Some(format!("user{id}")),
            reply_to,
            text: format!("message {id}"),
            reactions: Vec::new(),
            has_media: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::message;
    use super::*;

    #[test]
    fn index_resolves_every_id() {
        let messages = vec![message(1, None), message(2, Some(1)), message(3, None)];
        let index = build_index(&messages);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&2).map(|m| m.id), Some(2));
        assert!(!index.contains_key(&4));
    }

    #[test]
    fn duplicate_ids_last_write_wins() {
        let mut first = message(9, None);
        first.text = "first".to_string();
        let mut second = message(9, None);
        second.text = "second".to_string();

        let messages = vec![first, second];
        let index = build_index(&messages);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&9).map(|m| m.text.as_str()), Some("second"));
    }

    #[test]
    fn reaction_total_saturates_instead_of_overflowing() {
        let mut msg = message(1, None);
        msg.reactions = vec![
            Reaction {
                emoji: "👍".to_string(),
                count: u32::MAX,
            },
            Reaction {
                emoji: "🔥".to_string(),
                count: 5,
            },
        ];
        assert_eq!(msg.reaction_total(), u32::MAX);
    }
}
