use chrono::Utc;
use leasedesk_connectors::oauth::load_token;
use leasedesk_core::config::{AppConfig, LoadOptions};
use leasedesk_core::ports::{MessageSource, PropertyCache};
use leasedesk_store::{JsonMailbox, JsonPropertyCache};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const LOCAL_CHECKS: [&str; 4] = ["coda_credentials", "calendar_token", "mailbox", "property_cache"];

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::output(output);
    }

    CommandResult::output(render_human(&report))
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_coda_credentials(&config));
            checks.extend(check_local_files(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(LOCAL_CHECKS.into_iter().map(DoctorCheck::skipped));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_coda_credentials(config: &AppConfig) -> DoctorCheck {
    match config.coda.ensure_ready() {
        Ok(()) => DoctorCheck::pass(
            "coda_credentials",
            format!("api key and table ids set for doc `{}`", config.coda.doc_id),
        ),
        Err(error) => DoctorCheck::fail("coda_credentials", error.to_string()),
    }
}

fn check_local_files(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return LOCAL_CHECKS[1..]
                .iter()
                .map(|name| DoctorCheck::fail(*name, details.clone()))
                .collect();
        }
    };

    runtime.block_on(async {
        let calendar_token = match load_token(&config.calendar.token_path).await {
            Ok(token) if token.is_expired(Utc::now()) && token.refresh_token.is_none() => {
                DoctorCheck::fail(
                    "calendar_token",
                    "token expired and has no refresh token; run `leasedesk authorize`",
                )
            }
            Ok(_) => DoctorCheck::pass(
                "calendar_token",
                format!("token found at `{}`", config.calendar.token_path.display()),
            ),
            Err(error) => DoctorCheck::fail("calendar_token", error.to_string()),
        };

        let mailbox = match JsonMailbox::new(&config.mailbox.path).load_messages().await {
            Ok(messages) => DoctorCheck::pass(
                "mailbox",
                format!("{} messages in `{}`", messages.len(), config.mailbox.path.display()),
            ),
            Err(error) => DoctorCheck::fail("mailbox", error.to_string()),
        };

        let property_cache = match JsonPropertyCache::new(&config.cache.path).load().await {
            Ok(Some(index)) => {
                DoctorCheck::pass("property_cache", format!("{} properties cached", index.len()))
            }
            Ok(None) => DoctorCheck::fail(
                "property_cache",
                "no property cache yet; run `leasedesk inventory`",
            ),
            Err(error) => DoctorCheck::fail("property_cache", error.to_string()),
        };

        vec![calendar_token, mailbox, property_cache]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
