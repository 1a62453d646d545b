use anyhow::Result;
use async_trait::async_trait;

use leasedesk_core::domain::schedule::BusySource;
use leasedesk_core::errors::ApplicationError;
use leasedesk_core::ports::CalendarClient;
use leasedesk_core::scheduling::SlotService;

use crate::steps::{PipelineContext, PipelineStep};

pub struct SchedulingStep<C> {
    service: SlotService<C>,
}

impl<C: CalendarClient> SchedulingStep<C> {
    pub fn new(service: SlotService<C>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<C: CalendarClient> PipelineStep for SchedulingStep<C> {
    fn name(&self) -> &'static str {
        "scheduling"
    }

    async fn run(&self, context: &mut PipelineContext) -> Result<String> {
        let report =
            self.service.report(context.today).await.map_err(ApplicationError::from)?;

        let mut output = report.availability.clone();
        if let BusySource::Degraded { reason } = &report.busy_source {
            output.push_str(&format!("\n(busy calendar unavailable: {reason})"));
        }
        for slot in report.suggested_slots(3) {
            output.push_str(&format!("\n  {}", slot.label()));
        }
        output.push_str(&format!("\nBooking link: {}", report.booking_link));

        context.schedule = Some(report);
        Ok(output)
    }
}
