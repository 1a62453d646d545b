use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use leasedesk_core::config::CalendarConfig;
use leasedesk_core::domain::schedule::BusyInterval;
use leasedesk_core::errors::{CalendarError, TransportError};
use leasedesk_core::ports::CalendarClient;

use crate::oauth::fresh_token;
use crate::{decode_json, endpoint, http_client, send_error};

/// Google Calendar v3 free/busy client backed by the local token file.
pub struct GoogleCalendarClient {
    client: Client,
    api_base_url: String,
    token_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: BTreeMap<String, CalendarBusy>,
}

#[derive(Debug, Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: String,
    end: String,
}

fn parse_local(raw: &str) -> Result<chrono::NaiveDateTime, CalendarError> {
    DateTime::<FixedOffset>::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Local).naive_local())
        .map_err(|error| CalendarError::Decode(format!("busy time `{raw}`: {error}")))
}

impl GoogleCalendarClient {
    pub fn new(
        api_base_url: impl Into<String>,
        token_path: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_base_url: api_base_url.into(),
            token_path: token_path.into(),
        })
    }

    pub fn from_config(config: &CalendarConfig) -> Result<Self, TransportError> {
        Self::new(config.api_base_url.clone(), config.token_path.clone(), config.timeout_secs)
    }

    pub fn http(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn query_busy(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let token = fresh_token(&self.client, &self.token_path).await?;
        let url = endpoint(&self.api_base_url, &["freeBusy"])?;
        let body = json!({
            "timeMin": time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeMax": time_max.to_rfc3339_opts(SecondsFormat::Secs, true),
            "items": [{"id": calendar_id}],
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&token.token)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let decoded: FreeBusyResponse = decode_json(response).await?;

        let Some(calendar) = decoded.calendars.get(calendar_id) else {
            return Err(CalendarError::Decode(format!(
                "free/busy response has no entry for `{calendar_id}`"
            )));
        };
        if !calendar.errors.is_empty() {
            return Err(CalendarError::Decode(format!(
                "free/busy reported errors for `{calendar_id}`: {}",
                Value::Array(calendar.errors.clone())
            )));
        }

        let busy = calendar
            .busy
            .iter()
            .map(|period| {
                Ok(BusyInterval {
                    start: parse_local(&period.start)?,
                    end: parse_local(&period.end)?,
                })
            })
            .collect::<Result<Vec<_>, CalendarError>>()?;
        debug!(calendar_id, busy = busy.len(), "free/busy fetched");
        Ok(busy)
    }
}
