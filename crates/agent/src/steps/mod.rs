pub mod intake;
pub mod property;
pub mod scheduling;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use leasedesk_core::domain::inventory::InventorySnapshot;
use leasedesk_core::domain::lead::{LeadIntake, PropertyMatch};
use leasedesk_core::domain::message::Message;
use leasedesk_core::domain::schedule::ScheduleReport;

pub use intake::IntakeStep;
pub use property::PropertyLookupStep;
pub use scheduling::SchedulingStep;

/// State shared by the steps of one run; each step reads what earlier steps wrote.
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub run_id: String,
    pub query: String,
    pub today: NaiveDate,
    pub message: Option<Message>,
    pub intake: Option<LeadIntake>,
    pub snapshot: Option<InventorySnapshot>,
    pub matches: Vec<PropertyMatch>,
    pub schedule: Option<ScheduleReport>,
}

impl PipelineContext {
    pub fn new(run_id: impl Into<String>, query: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            run_id: run_id.into(),
            query: query.into(),
            today,
            message: None,
            intake: None,
            snapshot: None,
            matches: Vec::new(),
            schedule: None,
        }
    }
}

#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the step and returns its textual output for the run report.
    async fn run(&self, context: &mut PipelineContext) -> Result<String>;
}
