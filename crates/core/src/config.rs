use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub coda: CodaConfig,
    pub calendar: CalendarConfig,
    pub mailbox: MailboxConfig,
    pub cache: CacheConfig,
    pub reply: ReplyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CodaConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub doc_id: String,
    pub available_table_id: String,
    pub unavailable_table_id: String,
    pub timeout_secs: u64,
    /// Column id to display name, used when the columns endpoint is unavailable.
    pub column_fallback: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub api_base_url: String,
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub booking_link: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MailboxConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub name_column: String,
}

#[derive(Clone, Debug)]
pub struct ReplyConfig {
    pub signature: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// A configured inventory table: display name plus remote identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub id: String,
}

pub const AVAILABLE_TABLE: &str = "Available Inventory";
pub const UNAVAILABLE_TABLE: &str = "Unavailable Inventory";

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub coda_api_key: Option<String>,
    pub coda_base_url: Option<String>,
    pub coda_doc_id: Option<String>,
    pub calendar_api_base_url: Option<String>,
    pub calendar_token_path: Option<PathBuf>,
    pub booking_link: Option<String>,
    pub mailbox_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("missing credential `{key}`: {hint}")]
    MissingCredential { key: &'static str, hint: &'static str },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            coda: CodaConfig {
                api_key: None,
                base_url: "https://coda.io/apis/v1".to_string(),
                doc_id: String::new(),
                available_table_id: String::new(),
                unavailable_table_id: String::new(),
                timeout_secs: 30,
                column_fallback: BTreeMap::new(),
            },
            calendar: CalendarConfig {
                calendar_id: "primary".to_string(),
                api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
                token_path: PathBuf::from("token.json"),
                client_secrets_path: PathBuf::from("credentials.json"),
                booking_link: "https://calendar.google.com/calendar/u/0/appointments".to_string(),
                timeout_secs: 30,
            },
            mailbox: MailboxConfig { path: PathBuf::from("mailbox.json") },
            cache: CacheConfig {
                path: PathBuf::from("inventory_cache.json"),
                name_column: "property_name".to_string(),
            },
            reply: ReplyConfig { signature: "The Leasing Team".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl CodaConfig {
    /// Returns the API key or a configuration error; call before any request.
    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        match &self.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential {
                key: "coda.api_key",
                hint: "set LEASEDESK_CODA_API_KEY (or CODA_API_KEY) to a Coda API token",
            }),
        }
    }

    /// Checks everything the inventory reader needs before it touches the network.
    pub fn ensure_ready(&self) -> Result<(), ConfigError> {
        self.require_api_key()?;
        if self.doc_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "coda.doc_id is required to read inventory".to_string(),
            ));
        }
        if self.available_table_id.trim().is_empty() || self.unavailable_table_id.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "coda.available_table_id and coda.unavailable_table_id are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tables(&self) -> Vec<TableRef> {
        vec![
            TableRef { name: AVAILABLE_TABLE.to_string(), id: self.available_table_id.clone() },
            TableRef { name: UNAVAILABLE_TABLE.to_string(), id: self.unavailable_table_id.clone() },
        ]
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leasedesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(coda) = patch.coda {
            if let Some(coda_api_key_value) = coda.api_key {
                self.coda.api_key = Some(secret_value(coda_api_key_value));
            }
            if let Some(base_url) = coda.base_url {
                self.coda.base_url = base_url;
            }
            if let Some(doc_id) = coda.doc_id {
                self.coda.doc_id = doc_id;
            }
            if let Some(available_table_id) = coda.available_table_id {
                self.coda.available_table_id = available_table_id;
            }
            if let Some(unavailable_table_id) = coda.unavailable_table_id {
                self.coda.unavailable_table_id = unavailable_table_id;
            }
            if let Some(timeout_secs) = coda.timeout_secs {
                self.coda.timeout_secs = timeout_secs;
            }
            if let Some(column_fallback) = coda.column_fallback {
                self.coda.column_fallback = column_fallback;
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(calendar_id) = calendar.calendar_id {
                self.calendar.calendar_id = calendar_id;
            }
            if let Some(api_base_url) = calendar.api_base_url {
                self.calendar.api_base_url = api_base_url;
            }
            if let Some(token_path) = calendar.token_path {
                self.calendar.token_path = token_path;
            }
            if let Some(client_secrets_path) = calendar.client_secrets_path {
                self.calendar.client_secrets_path = client_secrets_path;
            }
            if let Some(booking_link) = calendar.booking_link {
                self.calendar.booking_link = booking_link;
            }
            if let Some(timeout_secs) = calendar.timeout_secs {
                self.calendar.timeout_secs = timeout_secs;
            }
        }

        if let Some(mailbox) = patch.mailbox {
            if let Some(path) = mailbox.path {
                self.mailbox.path = path;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(path) = cache.path {
                self.cache.path = path;
            }
            if let Some(name_column) = cache.name_column {
                self.cache.name_column = name_column;
            }
        }

        if let Some(reply) = patch.reply {
            if let Some(signature) = reply.signature {
                self.reply.signature = signature;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let coda_api_key =
            read_env("LEASEDESK_CODA_API_KEY").or_else(|| read_env("CODA_API_KEY"));
        if let Some(value) = coda_api_key {
            self.coda.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEASEDESK_CODA_BASE_URL") {
            self.coda.base_url = value;
        }
        if let Some(value) = read_env("LEASEDESK_CODA_DOC_ID") {
            self.coda.doc_id = value;
        }
        if let Some(value) = read_env("LEASEDESK_CODA_AVAILABLE_TABLE_ID") {
            self.coda.available_table_id = value;
        }
        if let Some(value) = read_env("LEASEDESK_CODA_UNAVAILABLE_TABLE_ID") {
            self.coda.unavailable_table_id = value;
        }
        if let Some(value) = read_env("LEASEDESK_CODA_TIMEOUT_SECS") {
            self.coda.timeout_secs = parse_u64("LEASEDESK_CODA_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEASEDESK_CALENDAR_ID") {
            self.calendar.calendar_id = value;
        }
        if let Some(value) = read_env("LEASEDESK_CALENDAR_API_BASE_URL") {
            self.calendar.api_base_url = value;
        }
        if let Some(value) = read_env("LEASEDESK_CALENDAR_TOKEN_PATH") {
            self.calendar.token_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("LEASEDESK_CALENDAR_CLIENT_SECRETS_PATH") {
            self.calendar.client_secrets_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("LEASEDESK_CALENDAR_BOOKING_LINK") {
            self.calendar.booking_link = value;
        }
        if let Some(value) = read_env("LEASEDESK_CALENDAR_TIMEOUT_SECS") {
            self.calendar.timeout_secs = parse_u64("LEASEDESK_CALENDAR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEASEDESK_MAILBOX_PATH") {
            self.mailbox.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("LEASEDESK_CACHE_PATH") {
            self.cache.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("LEASEDESK_CACHE_NAME_COLUMN") {
            self.cache.name_column = value;
        }
        if let Some(value) = read_env("LEASEDESK_REPLY_SIGNATURE") {
            self.reply.signature = value;
        }

        let log_level =
            read_env("LEASEDESK_LOGGING_LEVEL").or_else(|| read_env("LEASEDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEASEDESK_LOGGING_FORMAT").or_else(|| read_env("LEASEDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(coda_api_key) = overrides.coda_api_key {
            self.coda.api_key = Some(secret_value(coda_api_key));
        }
        if let Some(coda_base_url) = overrides.coda_base_url {
            self.coda.base_url = coda_base_url;
        }
        if let Some(coda_doc_id) = overrides.coda_doc_id {
            self.coda.doc_id = coda_doc_id;
        }
        if let Some(api_base_url) = overrides.calendar_api_base_url {
            self.calendar.api_base_url = api_base_url;
        }
        if let Some(token_path) = overrides.calendar_token_path {
            self.calendar.token_path = token_path;
        }
        if let Some(booking_link) = overrides.booking_link {
            self.calendar.booking_link = booking_link;
        }
        if let Some(mailbox_path) = overrides.mailbox_path {
            self.mailbox.path = mailbox_path;
        }
        if let Some(cache_path) = overrides.cache_path {
            self.cache.path = cache_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_coda(&self.coda)?;
        validate_calendar(&self.calendar)?;
        validate_files(&self.mailbox, &self.cache)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leasedesk.toml"), PathBuf::from("config/leasedesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_coda(coda: &CodaConfig) -> Result<(), ConfigError> {
    validate_http_url("coda.base_url", coda.base_url.trim())?;
    validate_timeout("coda.timeout_secs", coda.timeout_secs)?;

    if coda.column_fallback.keys().any(|column_id| column_id.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "coda.column_fallback keys must be non-empty column ids".to_string(),
        ));
    }

    Ok(())
}

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    validate_http_url("calendar.api_base_url", calendar.api_base_url.trim())?;
    validate_http_url("calendar.booking_link", calendar.booking_link.trim())?;
    validate_timeout("calendar.timeout_secs", calendar.timeout_secs)?;

    if calendar.calendar_id.trim().is_empty() {
        return Err(ConfigError::Validation("calendar.calendar_id must not be empty".to_string()));
    }
    if calendar.token_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("calendar.token_path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_files(mailbox: &MailboxConfig, cache: &CacheConfig) -> Result<(), ConfigError> {
    if mailbox.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("mailbox.path must not be empty".to_string()));
    }
    if cache.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("cache.path must not be empty".to_string()));
    }
    if cache.name_column.trim().is_empty() {
        return Err(ConfigError::Validation("cache.name_column must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    coda: Option<CodaPatch>,
    calendar: Option<CalendarPatch>,
    mailbox: Option<MailboxPatch>,
    cache: Option<CachePatch>,
    reply: Option<ReplyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CodaPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    doc_id: Option<String>,
    available_table_id: Option<String>,
    unavailable_table_id: Option<String>,
    timeout_secs: Option<u64>,
    column_fallback: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    calendar_id: Option<String>,
    api_base_url: Option<String>,
    token_path: Option<PathBuf>,
    client_secrets_path: Option<PathBuf>,
    booking_link: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MailboxPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    path: Option<PathBuf>,
    name_column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyPatch {
    signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
