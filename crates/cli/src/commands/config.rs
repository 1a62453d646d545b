use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leasedesk_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

/// Effective configuration, one line per key, with the source that set it.
pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let config_file_path = detect_config_path(explicit_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let coda_api_key = config
        .coda
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let column_fallback = if config.coda.column_fallback.is_empty() {
        "<none>".to_string()
    } else {
        format!("{} columns", config.coda.column_fallback.len())
    };

    let entries = vec![
        entry("coda.api_key", coda_api_key, &["LEASEDESK_CODA_API_KEY", "CODA_API_KEY"]),
        entry("coda.base_url", config.coda.base_url.clone(), &["LEASEDESK_CODA_BASE_URL"]),
        entry("coda.doc_id", or_unset(&config.coda.doc_id), &["LEASEDESK_CODA_DOC_ID"]),
        entry(
            "coda.available_table_id",
            or_unset(&config.coda.available_table_id),
            &["LEASEDESK_CODA_AVAILABLE_TABLE_ID"],
        ),
        entry(
            "coda.unavailable_table_id",
            or_unset(&config.coda.unavailable_table_id),
            &["LEASEDESK_CODA_UNAVAILABLE_TABLE_ID"],
        ),
        entry(
            "coda.timeout_secs",
            config.coda.timeout_secs.to_string(),
            &["LEASEDESK_CODA_TIMEOUT_SECS"],
        ),
        entry("coda.column_fallback", column_fallback, &[]),
        entry(
            "calendar.calendar_id",
            config.calendar.calendar_id.clone(),
            &["LEASEDESK_CALENDAR_ID"],
        ),
        entry(
            "calendar.api_base_url",
            config.calendar.api_base_url.clone(),
            &["LEASEDESK_CALENDAR_API_BASE_URL"],
        ),
        entry(
            "calendar.token_path",
            config.calendar.token_path.display().to_string(),
            &["LEASEDESK_CALENDAR_TOKEN_PATH"],
        ),
        entry(
            "calendar.client_secrets_path",
            config.calendar.client_secrets_path.display().to_string(),
            &["LEASEDESK_CALENDAR_CLIENT_SECRETS_PATH"],
        ),
        entry(
            "calendar.booking_link",
            config.calendar.booking_link.clone(),
            &["LEASEDESK_CALENDAR_BOOKING_LINK"],
        ),
        entry(
            "calendar.timeout_secs",
            config.calendar.timeout_secs.to_string(),
            &["LEASEDESK_CALENDAR_TIMEOUT_SECS"],
        ),
        entry(
            "mailbox.path",
            config.mailbox.path.display().to_string(),
            &["LEASEDESK_MAILBOX_PATH"],
        ),
        entry("cache.path", config.cache.path.display().to_string(), &["LEASEDESK_CACHE_PATH"]),
        entry(
            "cache.name_column",
            config.cache.name_column.clone(),
            &["LEASEDESK_CACHE_NAME_COLUMN"],
        ),
        entry("reply.signature", config.reply.signature.clone(), &["LEASEDESK_REPLY_SIGNATURE"]),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["LEASEDESK_LOGGING_LEVEL", "LEASEDESK_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["LEASEDESK_LOGGING_FORMAT", "LEASEDESK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .into_iter()
            .map(|(key, value, env_keys)| render_line(key, &value, source(key, env_keys))),
    );

    CommandResult::output(lines.join("\n"))
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key, value, env_keys)
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("leasedesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/leasedesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of a long token so operators can tell keys apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if trimmed.chars().count() > 12 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::redact_token;

    #[test]
    fn redaction_never_reveals_short_tokens() {
        assert_eq!(redact_token("   "), "<empty>");
        assert_eq!(redact_token("short-key"), "<redacted>");
        assert_eq!(redact_token("abcd1234-ffff-eeee-9999"), "abcd***");
    }
}
