use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no message matched query `{query}`")]
    NoMatchingMessage { query: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("credential failure: {0}")]
    Credentials(String),
}

impl ApplicationError {
    /// Stable machine-readable class, surfaced by the CLI.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config",
            Self::Credentials(_) => "credentials",
        }
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::MissingCredential { .. } => Self::Credentials(value.to_string()),
            other => Self::Configuration(other.to_string()),
        }
    }
}

/// A failed remote call. `status` is absent when no HTTP response arrived.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", describe_transport(*.status, .body))]
pub struct TransportError {
    pub status: Option<u16>,
    pub body: String,
}

fn describe_transport(status: Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("request failed with status {status}: {body}"),
        None => format!("request failed before a response was received: {body}"),
    }
}

impl TransportError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self { status: Some(status), body: body.into() }
    }

    pub fn unreachable(body: impl Into<String>) -> Self {
        Self { status: None, body: body.into() }
    }
}

impl From<TransportError> for ApplicationError {
    fn from(value: TransportError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar credentials not found at `{path}`; run `leasedesk authorize` first")]
    MissingCredentials { path: PathBuf },
    #[error("calendar credentials are invalid: {0}")]
    InvalidCredentials(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not decode calendar response: {0}")]
    Decode(String),
}

impl From<CalendarError> for ApplicationError {
    fn from(value: CalendarError) -> Self {
        match value {
            CalendarError::MissingCredentials { .. } | CalendarError::InvalidCredentials(_) => {
                Self::Credentials(value.to_string())
            }
            CalendarError::Transport(_) | CalendarError::Decode(_) => {
                Self::Integration(value.to_string())
            }
        }
    }
}
