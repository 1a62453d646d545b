use tracing::{info, warn};

use crate::domain::message::Message;
use crate::errors::ApplicationError;
use crate::ports::MessageSource;

pub const NO_MATCHES: &str = "No matching messages found.";

pub struct MessageReader<S> {
    source: S,
}

impl<S: MessageSource> MessageReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Messages containing `query` in any field, in storage order.
    pub async fn search(&self, query: &str) -> Result<Vec<Message>, ApplicationError> {
        let messages = self.source.load_messages().await?;
        let total = messages.len();
        let matches: Vec<Message> =
            messages.into_iter().filter(|message| message.matches(query)).collect();

        info!(
            event_name = "messages.search",
            total,
            matched = matches.len(),
            "message search completed"
        );
        Ok(matches)
    }

    /// Text summary of the matches; a store failure becomes the returned text.
    pub async fn summarize(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(matches) => summarize_matches(&matches),
            Err(error) => {
                warn!(event_name = "messages.read_failed", error = %error, "message store unreadable");
                format!("Error reading messages: {error}")
            }
        }
    }
}

pub fn summarize_matches(matches: &[Message]) -> String {
    if matches.is_empty() {
        return NO_MATCHES.to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(index, message)| {
            format!(
                "--- Match {} ---\nFrom: {}\nSubject: {}\nBody: {}",
                index + 1,
                message.sender(),
                message.subject(),
                message.body()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
