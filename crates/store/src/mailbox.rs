use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use leasedesk_core::domain::message::Message;
use leasedesk_core::errors::ApplicationError;
use leasedesk_core::ports::MessageSource;

use crate::StoreError;

/// Mailbox export: a JSON array of message objects.
pub struct JsonMailbox {
    path: PathBuf,
}

impl JsonMailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<Message>, StoreError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Read { path: self.path.clone(), source })?;
        decode_messages(&raw)
            .map_err(|message| StoreError::Decode { path: self.path.clone(), message })
    }
}

#[async_trait]
impl MessageSource for JsonMailbox {
    async fn load_messages(&self) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.read().await?)
    }
}

fn field_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_messages(raw: &str) -> Result<Vec<Message>, String> {
    let value: Value = serde_json::from_str(raw).map_err(|error| error.to_string())?;
    let Value::Array(items) = value else {
        return Err("expected a JSON array of messages".to_string());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(Message::from_pairs(
                map.into_iter().map(|(key, value)| (key, field_text(value))),
            )),
            _ => Err(format!("message {index} is not an object")),
        })
        .collect()
}

#[derive(Default)]
pub struct InMemoryMailbox {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMailbox {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages: RwLock::new(messages) }
    }

    pub async fn push(&self, message: Message) {
        self.messages.write().await.push(message);
    }
}

#[async_trait]
impl MessageSource for InMemoryMailbox {
    async fn load_messages(&self) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.messages.read().await.clone())
    }
}
