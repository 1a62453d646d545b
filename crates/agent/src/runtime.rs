use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use leasedesk_core::domain::lead::ReplyDraft;

use crate::reply::ReplyComposer;
use crate::steps::{PipelineContext, PipelineStep};

const REPLY_STEP: &str = "reply";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepOutput {
    pub name: String,
    pub output: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub steps: Vec<StepOutput>,
    pub reply: ReplyDraft,
}

/// A run that stopped at `step`; `completed` holds what ran before it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("pipeline run {run_id} failed at step `{step}`: {message}")]
pub struct PipelineFailure {
    pub run_id: String,
    pub step: String,
    pub completed: Vec<StepOutput>,
    pub message: String,
}

/// Runs the configured steps strictly in order, then composes the reply.
pub struct LeadPipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    composer: ReplyComposer,
    booking_link: String,
}

impl LeadPipeline {
    pub fn new(composer: ReplyComposer, booking_link: impl Into<String>) -> Self {
        Self { steps: Vec::new(), composer, booking_link: booking_link.into() }
    }

    pub fn with_step(mut self, step: impl PipelineStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub async fn run(&self, query: &str, today: NaiveDate) -> Result<PipelineRun, PipelineFailure> {
        let run_id = Uuid::new_v4().to_string();
        let mut context = PipelineContext::new(run_id.clone(), query, today);
        let mut completed = Vec::with_capacity(self.steps.len());

        info!(
            event_name = "pipeline.run.started",
            correlation_id = %run_id,
            steps = self.steps.len(),
            "lead pipeline started"
        );

        for step in &self.steps {
            info!(
                event_name = "pipeline.step.started",
                correlation_id = %run_id,
                step = step.name(),
                "pipeline step started"
            );
            match step.run(&mut context).await {
                Ok(output) => {
                    info!(
                        event_name = "pipeline.step.completed",
                        correlation_id = %run_id,
                        step = step.name(),
                        "pipeline step completed"
                    );
                    completed.push(StepOutput { name: step.name().to_string(), output });
                }
                Err(step_error) => {
                    return Err(fail(&run_id, step.name(), completed, format!("{step_error:#}")));
                }
            }
        }

        let Some(intake) = context.intake.as_ref() else {
            let message = "no lead intake was produced".to_string();
            return Err(fail(&run_id, REPLY_STEP, completed, message));
        };
        let reply = match self.composer.compose(
            intake,
            &context.matches,
            context.schedule.as_ref(),
            &self.booking_link,
        ) {
            Ok(reply) => reply,
            Err(reply_error) => {
                return Err(fail(&run_id, REPLY_STEP, completed, reply_error.to_string()));
            }
        };

        info!(
            event_name = "pipeline.run.completed",
            correlation_id = %run_id,
            recipient = %reply.recipient,
            "lead pipeline completed"
        );
        Ok(PipelineRun { run_id, steps: completed, reply })
    }
}

fn fail(run_id: &str, step: &str, completed: Vec<StepOutput>, message: String) -> PipelineFailure {
    error!(
        event_name = "pipeline.step.failed",
        correlation_id = %run_id,
        step,
        error = %message,
        "pipeline run terminated"
    );
    PipelineFailure { run_id: run_id.to_string(), step: step.to_string(), completed, message }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use leasedesk_core::domain::lead::{LeadIntake, MainRequest, PropertyRequirements};

    use super::*;

    struct RecordingStep {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl PipelineStep for RecordingStep {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, context: &mut PipelineContext) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("{} exploded", self.name));
            }
            context.intake = Some(LeadIntake {
                lead_name: "Sam".to_string(),
                sender_address: "sam@example.com".to_string(),
                subject: context.query.clone(),
                main_request: MainRequest::Tour,
                requirements: PropertyRequirements::default(),
            });
            Ok(format!("{} saw {}", self.name, context.query))
        }
    }

    fn step(name: &'static str, calls: &Arc<AtomicUsize>, fail: bool) -> RecordingStep {
        RecordingStep { name, calls: Arc::clone(calls), fail }
    }

    fn pipeline() -> LeadPipeline {
        let composer = ReplyComposer::new("Leasing", "Property Name").expect("template parses");
        LeadPipeline::new(composer, "https://book.example/desk")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    #[tokio::test]
    async fn runs_steps_in_order_and_composes_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline =
            pipeline().with_step(step("first", &calls, false)).with_step(step("second", &calls, false));

        let run = pipeline.run("tour", today()).await.expect("run succeeds");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.step_names(), vec!["first", "second"]);
        let names: Vec<&str> = run.steps.iter().map(|step| step.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(run.steps[0].output, "first saw tour");
        assert_eq!(run.reply.recipient, "sam@example.com");
        assert!(run.reply.body.contains("https://book.example/desk"));
        assert!(!run.run_id.is_empty());
    }

    #[tokio::test]
    async fn failing_step_stops_later_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline()
            .with_step(step("intake", &calls, false))
            .with_step(step("property_lookup", &calls, true))
            .with_step(step("scheduling", &later, false));

        let failure = pipeline.run("tour", today()).await.expect_err("run fails");

        assert_eq!(failure.step, "property_lookup");
        assert_eq!(failure.completed.len(), 1);
        assert_eq!(failure.completed[0].name, "intake");
        assert!(failure.message.contains("property_lookup exploded"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_without_intake_fails_at_reply() {
        let pipeline = pipeline();

        let failure = pipeline.run("anything", today()).await.expect_err("nothing to reply to");

        assert_eq!(failure.step, "reply");
        assert!(failure.completed.is_empty());
    }

    #[tokio::test]
    async fn each_run_gets_its_own_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline().with_step(step("intake", &calls, false));

        let first = pipeline.run("a", today()).await.expect("first run");
        let second = pipeline.run("b", today()).await.expect("second run");

        assert_ne!(first.run_id, second.run_id);
    }
}
