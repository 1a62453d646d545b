use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tempfile::TempDir;

use leasedesk_agent::{
    IntakeStep, LeadPipeline, PropertyLookupStep, ReplyComposer, SchedulingStep,
};
use leasedesk_core::config::{TableRef, AVAILABLE_TABLE, UNAVAILABLE_TABLE};
use leasedesk_core::domain::inventory::{ColumnInfo, RawRow, TableInfo};
use leasedesk_core::domain::message::Message;
use leasedesk_core::domain::schedule::BusyInterval;
use leasedesk_core::errors::{CalendarError, TransportError};
use leasedesk_core::inventory::cache::{lookup_property, PropertyLookup};
use leasedesk_core::inventory::InventoryReader;
use leasedesk_core::messages::MessageReader;
use leasedesk_core::ports::{CalendarClient, TabularStore};
use leasedesk_core::scheduling::SlotService;
use leasedesk_store::{InMemoryMailbox, JsonPropertyCache};

const LINK: &str = "https://calendar.app.google/leasing-desk";

struct Inventory;

fn raw(id: &str, values: &[(&str, &str)]) -> RawRow {
    RawRow {
        id: id.to_string(),
        values: values.iter().map(|(column, value)| (column.to_string(), json!(value))).collect(),
    }
}

#[async_trait]
impl TabularStore for Inventory {
    async fn fetch_rows(&self, _doc_id: &str, table_id: &str) -> Result<Vec<RawRow>, TransportError> {
        match table_id {
            "t-avail" => Ok(vec![
                raw("i-1", &[("c-name", "Harbor Flex"), ("c-type", "Flex"), ("c-rsf", "12,000")]),
                raw("i-2", &[("c-name", "Main Street Office"), ("c-type", "Office"), ("c-rsf", "5,200")]),
            ]),
            "t-unavail" => Ok(vec![raw("u-1", &[("c-name", "Old Mill"), ("c-type", "Industrial")])]),
            _ => Err(TransportError::status(404, "no such table")),
        }
    }

    async fn fetch_columns(
        &self,
        _doc_id: &str,
        _table_id: &str,
    ) -> Result<Vec<ColumnInfo>, TransportError> {
        Ok(vec![
            ColumnInfo { id: "c-name".to_string(), name: "Property Name".to_string() },
            ColumnInfo { id: "c-type".to_string(), name: "Type".to_string() },
            ColumnInfo { id: "c-rsf".to_string(), name: "RSF".to_string() },
        ])
    }

    async fn list_tables(&self, _doc_id: &str) -> Result<Vec<TableInfo>, TransportError> {
        Ok(Vec::new())
    }
}

struct Calendar {
    calls: Arc<AtomicUsize>,
    missing_token: bool,
}

#[async_trait]
impl CalendarClient for Calendar {
    async fn query_busy(
        &self,
        _calendar_id: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_token {
            return Err(CalendarError::MissingCredentials { path: "token.json".into() });
        }
        let start = NaiveDate::from_ymd_opt(2026, 10, 23)
            .and_then(|day| day.and_hms_opt(9, 0, 0))
            .expect("valid busy start");
        Ok(vec![BusyInterval { start, end: start + chrono::Duration::hours(1) }])
    }
}

fn inquiry() -> Message {
    Message::from_pairs([
        ("from", "Dana Whitfield <dana@tenantco.com>"),
        ("subject", "Office space on Main Street"),
        ("body", "We need about 5,000 sf of office. Could we schedule a tour next week?"),
    ])
}

fn pipeline(cache_dir: &TempDir, calendar: Calendar) -> LeadPipeline {
    let tables = vec![
        TableRef { name: AVAILABLE_TABLE.to_string(), id: "t-avail".to_string() },
        TableRef { name: UNAVAILABLE_TABLE.to_string(), id: "t-unavail".to_string() },
    ];
    let reader = InventoryReader::new(Inventory, "doc-1", tables, BTreeMap::new());
    let cache = JsonPropertyCache::new(cache_dir.path().join("property_cache.json"));
    let mailbox = InMemoryMailbox::with_messages(vec![inquiry()]);
    let composer = ReplyComposer::new("Leasing Desk", "Property Name").expect("template parses");

    LeadPipeline::new(composer, LINK)
        .with_step(IntakeStep::new(MessageReader::new(mailbox)))
        .with_step(PropertyLookupStep::new(reader, cache, "Property Name"))
        .with_step(SchedulingStep::new(SlotService::new(calendar, "primary", LINK)))
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

#[tokio::test]
async fn full_run_matches_property_and_offers_open_friday_slots() {
    let cache_dir = TempDir::new().expect("temp dir");
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(&cache_dir, Calendar { calls: Arc::clone(&calls), missing_token: false });

    let run = pipeline.run("main street", monday()).await.expect("pipeline succeeds");

    let names: Vec<&str> = run.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(names, vec!["intake", "property_lookup", "scheduling"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(run.reply.recipient, "dana@tenantco.com");
    assert_eq!(run.reply.subject, "Re: Office space on Main Street");
    assert!(run.reply.body.starts_with("Hi Dana Whitfield,"));
    assert!(run.reply.body.contains("Main Street Office"));
    assert!(!run.reply.body.contains("Harbor Flex"));
    assert!(!run.reply.body.contains("Old Mill"));
    assert!(!run.reply.body.contains("9:00 AM-10:00 AM"));
    assert!(run.reply.body.contains("Friday October 23, 2026 10:00 AM-11:00 AM"));
    assert!(run.reply.body.contains(LINK));

    let cache = JsonPropertyCache::new(cache_dir.path().join("property_cache.json"));
    let lookup = lookup_property(&cache, "old mill").await.expect("cache was written");
    assert!(matches!(lookup, PropertyLookup::Found(_)));
}

#[tokio::test]
async fn unmatched_query_stops_before_inventory_and_calendar() {
    let cache_dir = TempDir::new().expect("temp dir");
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(&cache_dir, Calendar { calls: Arc::clone(&calls), missing_token: false });

    let failure = pipeline.run("no such lead", monday()).await.expect_err("no message matches");

    assert_eq!(failure.step, "intake");
    assert!(failure.completed.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!cache_dir.path().join("property_cache.json").exists());
}

#[tokio::test]
async fn missing_calendar_token_terminates_at_scheduling() {
    let cache_dir = TempDir::new().expect("temp dir");
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(&cache_dir, Calendar { calls: Arc::clone(&calls), missing_token: true });

    let failure = pipeline.run("main street", monday()).await.expect_err("credentials missing");

    assert_eq!(failure.step, "scheduling");
    assert_eq!(failure.completed.len(), 2);
    assert!(failure.message.contains("leasedesk authorize"));
}
