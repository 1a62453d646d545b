use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An inbound message as stored: opaque string fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    pub fields: BTreeMap<String, String>,
}

impl Message {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self { fields: pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn sender(&self) -> &str {
        self.field("from").or_else(|| self.field("sender")).unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.field("subject").unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        self.field("body").unwrap_or_default()
    }

    /// Case-insensitive substring match over every field value.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        needle.is_empty() || self.fields.values().any(|value| value.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn sender_falls_back_to_sender_field() {
        let message = Message::from_pairs([("sender", "ops@example.com")]);
        assert_eq!(message.sender(), "ops@example.com");

        let message = Message::from_pairs([("from", "a@example.com"), ("sender", "b@example.com")]);
        assert_eq!(message.sender(), "a@example.com");
    }

    #[test]
    fn match_ignores_case_and_checks_all_fields() {
        let message = Message::from_pairs([("subject", "Office Space"), ("body", "hello")]);

        assert!(message.matches("office"));
        assert!(message.matches("HELLO"));
        assert!(message.matches(""));
        assert!(!message.matches("retail"));
    }
}
