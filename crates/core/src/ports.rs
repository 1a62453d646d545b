//! Seams to the outside world. Adapters live in `leasedesk-store` and
//! `leasedesk-connectors`; tests use in-process fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::inventory::{ColumnInfo, RawRow, TableInfo};
use crate::domain::message::Message;
use crate::domain::schedule::BusyInterval;
use crate::errors::{ApplicationError, CalendarError, TransportError};
use crate::inventory::cache::PropertyIndex;

#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn fetch_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<RawRow>, TransportError>;

    async fn fetch_columns(
        &self,
        doc_id: &str,
        table_id: &str,
    ) -> Result<Vec<ColumnInfo>, TransportError>;

    async fn list_tables(&self, doc_id: &str) -> Result<Vec<TableInfo>, TransportError>;
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Busy intervals overlapping `[time_min, time_max)`, in local wall-clock time.
    async fn query_busy(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError>;
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn load_messages(&self) -> Result<Vec<Message>, ApplicationError>;
}

#[async_trait]
pub trait PropertyCache: Send + Sync {
    async fn store(&self, index: &PropertyIndex) -> Result<(), ApplicationError>;

    /// `None` when nothing has been cached yet.
    async fn load(&self) -> Result<Option<PropertyIndex>, ApplicationError>;
}
