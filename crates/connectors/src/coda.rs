use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use leasedesk_core::config::{CodaConfig, ConfigError};
use leasedesk_core::domain::inventory::{ColumnInfo, RawRow, TableInfo};
use leasedesk_core::errors::TransportError;
use leasedesk_core::ports::TabularStore;

use crate::{decode_json, endpoint, http_client, send_error};

/// Coda REST v1 client, bearer-authenticated.
pub struct CodaClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowItem {
    id: String,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    id: String,
    name: Option<String>,
}

impl NamedItem {
    fn into_parts(self) -> (String, String) {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        (self.id, name)
    }
}

impl CodaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        Ok(Self { client: http_client(timeout_secs)?, base_url: base_url.into(), api_key })
    }

    /// Builds a client from config, failing on a missing API key before any request.
    pub fn from_config(config: &CodaConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.clone();
        Self::new(config.base_url.clone(), api_key, config.timeout_secs)
            .map_err(|error| ConfigError::Validation(error.body))
    }

    /// Follows `nextPageToken` until the listing is exhausted.
    async fn get_all<T>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, TransportError>
    where
        T: DeserializeOwned,
    {
        let url = endpoint(&self.base_url, segments)?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(url.clone()).bearer_auth(self.api_key.expose_secret());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(send_error)?;
            let page: Page<T> = decode_json(response).await?;
            debug!(url = %url, items = page.items.len(), "coda page fetched");
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl TabularStore for CodaClient {
    async fn fetch_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<RawRow>, TransportError> {
        let rows: Vec<RowItem> = self
            .get_all(&["docs", doc_id, "tables", table_id, "rows"], &[])
            .await?;
        Ok(rows.into_iter().map(|row| RawRow { id: row.id, values: row.values }).collect())
    }

    async fn fetch_columns(
        &self,
        doc_id: &str,
        table_id: &str,
    ) -> Result<Vec<ColumnInfo>, TransportError> {
        let columns: Vec<NamedItem> =
            self.get_all(&["docs", doc_id, "tables", table_id, "columns"], &[]).await?;
        Ok(columns
            .into_iter()
            .map(NamedItem::into_parts)
            .map(|(id, name)| ColumnInfo { id, name })
            .collect())
    }

    async fn list_tables(&self, doc_id: &str) -> Result<Vec<TableInfo>, TransportError> {
        let tables: Vec<NamedItem> = self.get_all(&["docs", doc_id, "tables"], &[]).await?;
        Ok(tables
            .into_iter()
            .map(NamedItem::into_parts)
            .map(|(id, name)| TableInfo { id, name })
            .collect())
    }
}
