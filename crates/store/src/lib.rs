pub mod cache;
pub mod mailbox;

use std::path::PathBuf;

use thiserror::Error;

use leasedesk_core::errors::ApplicationError;

pub use cache::JsonPropertyCache;
pub use mailbox::{InMemoryMailbox, JsonMailbox};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not decode `{path}`: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("could not encode store contents: {0}")]
    Encode(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}
