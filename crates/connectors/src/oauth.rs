//! Calendar credentials: the persisted token file, refresh of expired access
//! tokens, and the one-time installed-app authorization flow.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use leasedesk_core::errors::{CalendarError, TransportError};

use crate::send_error;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

pub async fn load_token(path: &Path) -> Result<StoredToken, CalendarError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(CalendarError::MissingCredentials { path: path.to_path_buf() })
        }
        Err(error) => {
            return Err(CalendarError::InvalidCredentials(format!(
                "could not read `{}`: {error}",
                path.display()
            )))
        }
    };

    serde_json::from_str(&raw).map_err(|error| {
        CalendarError::InvalidCredentials(format!("`{}` is not a token file: {error}", path.display()))
    })
}

pub async fn save_token(path: &Path, token: &StoredToken) -> Result<(), CalendarError> {
    let encoded = serde_json::to_string_pretty(token)
        .map_err(|error| CalendarError::InvalidCredentials(error.to_string()))?;
    tokio::fs::write(path, encoded).await.map_err(|error| {
        CalendarError::InvalidCredentials(format!("could not write `{}`: {error}", path.display()))
    })
}

async fn post_token_form(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, CalendarError> {
    let response = client.post(token_uri).form(form).send().await.map_err(send_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CalendarError::InvalidCredentials(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|error| CalendarError::Decode(format!("token response: {error}")))?;
    if token.access_token.is_empty() {
        return Err(CalendarError::InvalidCredentials(
            "token endpoint returned empty access token".to_string(),
        ));
    }
    Ok(token)
}

fn expiry_from(expires_in: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    expires_in.map(|seconds| now + Duration::seconds(seconds))
}

/// Exchanges the stored refresh token for a new access token.
pub async fn refresh_token(
    client: &Client,
    token: &StoredToken,
) -> Result<StoredToken, CalendarError> {
    let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
        CalendarError::InvalidCredentials(
            "access token expired and no refresh token is stored".to_string(),
        )
    })?;

    let response = post_token_form(
        client,
        &token.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
        ],
    )
    .await
    .map_err(|error| match error {
        CalendarError::Transport(transport) => {
            CalendarError::InvalidCredentials(format!("token refresh failed: {transport}"))
        }
        other => other,
    })?;

    Ok(StoredToken {
        token: response.access_token,
        refresh_token: response.refresh_token.or_else(|| token.refresh_token.clone()),
        expiry: expiry_from(response.expires_in, Utc::now()),
        ..token.clone()
    })
}

/// Loads the token file, refreshing and rewriting it when the access token expired.
pub async fn fresh_token(client: &Client, path: &Path) -> Result<StoredToken, CalendarError> {
    let token = load_token(path).await?;
    if !token.is_expired(Utc::now()) {
        return Ok(token);
    }

    let refreshed = refresh_token(client, &token).await?;
    save_token(path, &refreshed).await?;
    info!(event_name = "calendar.token.refreshed", "calendar access token refreshed");
    Ok(refreshed)
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

pub async fn load_client_secrets(path: &Path) -> Result<ClientSecrets, CalendarError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            CalendarError::MissingCredentials { path: path.to_path_buf() }
        } else {
            CalendarError::InvalidCredentials(format!("could not read `{}`: {error}", path.display()))
        }
    })?;

    let file: ClientSecretsFile = serde_json::from_str(&raw)
        .map_err(|error| CalendarError::InvalidCredentials(format!("client secrets: {error}")))?;
    file.installed.or(file.web).ok_or_else(|| {
        CalendarError::InvalidCredentials(
            "client secrets must contain an `installed` or `web` section".to_string(),
        )
    })
}

pub fn consent_url(secrets: &ClientSecrets, redirect_uri: &str) -> Result<Url, CalendarError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", CALENDAR_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|error| CalendarError::InvalidCredentials(format!("invalid auth_uri: {error}")))
}

/// Pulls `code` out of the redirect's request line, or the provider's `error`.
pub fn code_from_request_line(request_line: &str) -> Result<String, CalendarError> {
    let target = request_line.split_whitespace().nth(1).unwrap_or_default();
    let url = Url::parse(&format!("http://localhost{target}"))
        .map_err(|error| CalendarError::Decode(format!("redirect request: {error}")))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(CalendarError::InvalidCredentials(format!(
                    "authorization was refused: {value}"
                )))
            }
            _ => {}
        }
    }
    code.filter(|code| !code.is_empty())
        .ok_or_else(|| CalendarError::Decode("redirect carried no authorization code".to_string()))
}

/// Serves `listener` until a redirect carrying `code` or `error` arrives.
///
/// Connections that send nothing (browser preconnects) or ask for other paths are answered
/// and skipped.
pub async fn receive_code(listener: &TcpListener) -> Result<String, CalendarError> {
    loop {
        let (mut socket, _) = listener.accept().await.map_err(|error| {
            CalendarError::Transport(TransportError::unreachable(format!(
                "loopback accept: {error}"
            )))
        })?;

        let mut buffer = vec![0_u8; 8192];
        let read = match socket.read(&mut buffer).await {
            Ok(0) => continue,
            Ok(read) => read,
            Err(error) => {
                debug!(%error, "loopback read failed; waiting for the next connection");
                continue;
            }
        };
        let request = String::from_utf8_lossy(&buffer[..read]);
        let request_line = request.lines().next().unwrap_or_default();
        let result = code_from_request_line(request_line);

        let (status, page) = match &result {
            Ok(_) => ("200 OK", "Authorization complete. You can close this window."),
            Err(CalendarError::Decode(_)) => ("404 Not Found", "Waiting for authorization."),
            Err(_) => ("200 OK", "Authorization failed. Return to the terminal for details."),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\n\
             connection: close\r\n\r\n{page}",
            page.len()
        );
        socket.write_all(response.as_bytes()).await.ok();

        match result {
            Err(CalendarError::Decode(_)) => {
                debug!(request_line, "loopback request without authorization result skipped");
            }
            other => return other,
        }
    }
}

pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<StoredToken, CalendarError> {
    let response = post_token_form(
        client,
        &secrets.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await?;

    let scopes = response
        .scope
        .map(|scope| scope.split_whitespace().map(str::to_string).collect())
        .unwrap_or_else(|| vec![CALENDAR_SCOPE.to_string()]);

    Ok(StoredToken {
        token: response.access_token,
        refresh_token: response.refresh_token,
        token_uri: secrets.token_uri.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes,
        expiry: expiry_from(response.expires_in, Utc::now()),
    })
}

/// Runs the full installed-app flow and writes the token file.
///
/// `announce` receives the consent URL; the caller shows it to the user.
pub async fn authorize(
    client: &Client,
    client_secrets_path: &Path,
    token_path: &Path,
    announce: impl FnOnce(&Url),
) -> Result<PathBuf, CalendarError> {
    let secrets = load_client_secrets(client_secrets_path).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|error| {
        CalendarError::Transport(TransportError::unreachable(format!("loopback bind: {error}")))
    })?;
    let port = listener
        .local_addr()
        .map_err(|error| {
            CalendarError::Transport(TransportError::unreachable(format!("loopback addr: {error}")))
        })?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}/");

    announce(&consent_url(&secrets, &redirect_uri)?);
    let code = receive_code(&listener).await?;
    let token = exchange_code(client, &secrets, &code, &redirect_uri).await?;
    save_token(token_path, &token).await?;

    info!(
        event_name = "calendar.authorize.completed",
        token_path = %token_path.display(),
        "calendar authorization stored"
    );
    Ok(token_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use leasedesk_core::errors::CalendarError;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::{
        code_from_request_line, consent_url, exchange_code, fresh_token, load_client_secrets,
        load_token, receive_code, save_token, ClientSecrets, StoredToken,
    };
    use crate::http_client;
    use crate::test_support::serve;

    fn token(token_uri: &str, expires_in_secs: i64) -> StoredToken {
        StoredToken {
            token: "old-access".to_owned(),
            refresh_token: Some("refresh-1".to_owned()),
            token_uri: token_uri.to_owned(),
            client_id: "client-1".to_owned(),
            client_secret: "secret-1".to_owned(),
            scopes: vec![super::CALENDAR_SCOPE.to_owned()],
            expiry: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        }
    }

    #[tokio::test]
    async fn missing_token_file_is_missing_credentials() {
        let dir = TempDir::new().expect("tempdir");

        let error = load_token(&dir.path().join("token.json")).await.expect_err("absent");

        assert!(matches!(error, CalendarError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn unexpired_token_is_used_as_is() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("token.json");
        save_token(&path, &token("http://127.0.0.1:9/token", 3600)).await.expect("save");

        let loaded = fresh_token(&http_client(5).expect("client"), &path).await.expect("fresh");

        assert_eq!(loaded.token, "old-access");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_written_back() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("token.json");
        let body = json!({"access_token": "new-access", "expires_in": 3599}).to_string();
        let (base_url, server) = serve(vec![(200, body)]).await;
        save_token(&path, &token(&format!("{base_url}/token"), -10)).await.expect("save");

        let refreshed =
            fresh_token(&http_client(5).expect("client"), &path).await.expect("refreshed");
        let requests = server.await.expect("server task");

        assert_eq!(refreshed.token, "new-access");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-1"));
        assert!(requests[0].contains("grant_type=refresh_token"));
        let on_disk = load_token(&path).await.expect("reload");
        assert_eq!(on_disk.token, "new-access");
    }

    #[tokio::test]
    async fn refresh_rejection_is_a_credential_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("token.json");
        let (base_url, _server) =
            serve(vec![(400, "{\"error\":\"invalid_grant\"}".to_owned())]).await;
        save_token(&path, &token(&format!("{base_url}/token"), -10)).await.expect("save");

        let error = fresh_token(&http_client(5).expect("client"), &path).await.expect_err("400");

        assert!(matches!(
            error,
            CalendarError::InvalidCredentials(ref message) if message.contains("invalid_grant")
        ));
    }

    #[test]
    fn redirect_code_is_extracted_or_refusal_reported() {
        let code = code_from_request_line("GET /?code=4%2Fabc&scope=x HTTP/1.1").expect("code");
        assert_eq!(code, "4/abc");

        let refused = code_from_request_line("GET /?error=access_denied HTTP/1.1");
        assert!(matches!(refused, Err(CalendarError::InvalidCredentials(_))));

        let empty = code_from_request_line("GET /favicon.ico HTTP/1.1");
        assert!(matches!(empty, Err(CalendarError::Decode(_))));
    }

    #[tokio::test]
    async fn loopback_skips_empty_connections_before_the_redirect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let receiver = tokio::spawn(async move { receive_code(&listener).await });

        drop(TcpStream::connect(addr).await.expect("preconnect"));
        let mut favicon = TcpStream::connect(addr).await.expect("favicon connect");
        favicon
            .write_all(b"GET /favicon.ico HTTP/1.1\r\nhost: x\r\n\r\n")
            .await
            .expect("write favicon");
        let mut ignored = String::new();
        favicon.read_to_string(&mut ignored).await.expect("favicon response");

        let mut redirect = TcpStream::connect(addr).await.expect("redirect connect");
        redirect
            .write_all(b"GET /?code=abc123 HTTP/1.1\r\nhost: x\r\n\r\n")
            .await
            .expect("write redirect");
        let mut page = String::new();
        redirect.read_to_string(&mut page).await.expect("redirect response");

        let code = receiver.await.expect("receiver task").expect("code");
        assert_eq!(code, "abc123");
        assert!(ignored.starts_with("HTTP/1.1 404"));
        assert!(page.contains("Authorization complete"));
    }

    #[tokio::test]
    async fn client_secrets_accept_installed_section() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            json!({"installed": {"client_id": "cid", "client_secret": "cs"}}).to_string(),
        )
        .expect("write secrets");

        let secrets = load_client_secrets(&path).await.expect("secrets");
        let url = consent_url(&secrets, "http://127.0.0.1:8080/").expect("consent url");

        assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.query_pairs().any(|(key, value)| key == "access_type" && value == "offline"));
        assert!(url.query_pairs().any(|(key, value)| key == "client_id" && value == "cid"));
    }

    #[tokio::test]
    async fn code_exchange_builds_token_file_contents() {
        let body = json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "scope": "https://www.googleapis.com/auth/calendar.readonly"
        })
        .to_string();
        let (base_url, server) = serve(vec![(200, body)]).await;
        let secrets = ClientSecrets {
            client_id: "cid".to_owned(),
            client_secret: "cs".to_owned(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_owned(),
            token_uri: format!("{base_url}/token"),
        };

        let client = http_client(5).expect("client");
        let token = exchange_code(&client, &secrets, "code-1", "http://127.0.0.1:1/")
            .await
            .expect("exchange");
        let requests = server.await.expect("server task");

        assert_eq!(token.token, "access-1");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(token.client_id, "cid");
        assert!(token.expiry.is_some());
        assert!(requests[0].contains("grant_type=authorization_code"));
        assert!(requests[0].contains("code=code-1"));
    }
}
