//! Lead pipeline for the leasing desk.
//!
//! A run walks an ordered list of steps over one shared [`steps::PipelineContext`]:
//! 1. **Intake** (`steps::intake`) - find the inquiry and extract the lead
//! 2. **Property lookup** (`steps::property`) - read inventory, refresh the cache, match rows
//! 3. **Scheduling** (`steps::scheduling`) - propose Friday tour slots
//!
//! The reply email is then rendered by [`reply::ReplyComposer`]. Extraction and
//! matching (`conversation`) are deterministic keyword rules.

pub mod conversation;
pub mod reply;
pub mod runtime;
pub mod steps;

pub use reply::{ReplyComposer, ReplyError};
pub use runtime::{LeadPipeline, PipelineFailure, PipelineRun, StepOutput};
pub use steps::{IntakeStep, PipelineContext, PipelineStep, PropertyLookupStep, SchedulingStep};
