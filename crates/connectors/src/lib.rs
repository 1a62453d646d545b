//! HTTP adapters for the remote services the pipeline talks to.

pub mod coda;
pub mod google_calendar;
pub mod oauth;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use leasedesk_core::errors::TransportError;

pub use coda::CodaClient;
pub use google_calendar::GoogleCalendarClient;

const USER_AGENT: &str = concat!("leasedesk/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|error| TransportError::unreachable(format!("http client setup failed: {error}")))
}

/// `base` with `segments` appended as escaped path segments.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = Url::parse(base.trim_end_matches('/'))
        .map_err(|error| TransportError::unreachable(format!("invalid base url `{base}`: {error}")))?;
    url.path_segments_mut()
        .map_err(|_| TransportError::unreachable(format!("base url `{base}` cannot hold a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn send_error(error: reqwest::Error) -> TransportError {
    TransportError { status: error.status().map(|status| status.as_u16()), body: error.to_string() }
}

/// Decodes a success body, or captures status and body of a failure.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::status(status.as_u16(), body));
    }

    response.json::<T>().await.map_err(|error| TransportError {
        status: Some(status.as_u16()),
        body: format!("could not decode response body: {error}"),
    })
}
