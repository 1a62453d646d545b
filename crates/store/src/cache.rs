use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use leasedesk_core::errors::ApplicationError;
use leasedesk_core::inventory::PropertyIndex;
use leasedesk_core::ports::PropertyCache;

use crate::StoreError;

/// Property index persisted as one pretty-printed JSON object.
pub struct JsonPropertyCache {
    path: PathBuf,
}

impl JsonPropertyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn write(&self, index: &PropertyIndex) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(index)
            .map_err(|error| StoreError::Encode(error.to_string()))?;
        tokio::fs::write(&self.path, encoded)
            .await
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })
    }

    async fn read(&self) -> Result<Option<PropertyIndex>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        serde_json::from_str(&raw).map(Some).map_err(|error| StoreError::Decode {
            path: self.path.clone(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl PropertyCache for JsonPropertyCache {
    async fn store(&self, index: &PropertyIndex) -> Result<(), ApplicationError> {
        Ok(self.write(index).await?)
    }

    async fn load(&self) -> Result<Option<PropertyIndex>, ApplicationError> {
        Ok(self.read().await?)
    }
}
