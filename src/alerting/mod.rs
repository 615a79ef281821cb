pub mod availability_sync;
pub mod evaluation_service;
pub mod rules;

pub use availability_sync::SyncSummary;
pub use evaluation_service::{EvaluationError, EvaluationOutcome, EvaluationService};
