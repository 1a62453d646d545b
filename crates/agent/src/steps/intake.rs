use anyhow::Result;
use async_trait::async_trait;

use leasedesk_core::errors::{ApplicationError, DomainError};
use leasedesk_core::messages::{summarize_matches, MessageReader};
use leasedesk_core::ports::MessageSource;

use crate::conversation::LeadIntakeExtractor;
use crate::steps::{PipelineContext, PipelineStep};

/// Finds the inquiry and extracts who is asking for what.
pub struct IntakeStep<S> {
    reader: MessageReader<S>,
    extractor: LeadIntakeExtractor,
}

impl<S: MessageSource> IntakeStep<S> {
    pub fn new(reader: MessageReader<S>) -> Self {
        Self { reader, extractor: LeadIntakeExtractor::new() }
    }
}

#[async_trait]
impl<S: MessageSource> PipelineStep for IntakeStep<S> {
    fn name(&self) -> &'static str {
        "intake"
    }

    async fn run(&self, context: &mut PipelineContext) -> Result<String> {
        let matches = self.reader.search(&context.query).await?;
        let Some(message) = matches.first().cloned() else {
            return Err(ApplicationError::from(DomainError::NoMatchingMessage {
                query: context.query.clone(),
            })
            .into());
        };

        let intake = self.extractor.extract(&message);
        let output = format!(
            "{}\n\nLead: {} <{}>\nMain request: {:?}\nLooking for: {}",
            summarize_matches(std::slice::from_ref(&message)),
            intake.lead_name,
            intake.sender_address,
            intake.main_request,
            intake.requirements.summary
        );

        context.message = Some(message);
        context.intake = Some(intake);
        Ok(output)
    }
}
