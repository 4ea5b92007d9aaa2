//! Reporter trait for dependency injection.
//!
//! Components receive a `&dyn Reporter` when they are constructed and log
//! through it, so concurrent runs and tests each capture their own output.

use std::time::Duration;

/// Outcome of a finished stage, as recorded by the stage runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded,
    /// Failed but the pipeline continues (e.g. optional resource compile).
    Tolerated,
    Failed,
}

pub trait Reporter {
    /// A named stage has started.
    fn stage_started(&self, stage: &str);

    /// A named stage has finished with the given status and message.
    fn stage_finished(
        &self,
        stage: &str,
        elapsed: Duration,
        outcome: StageOutcome,
        status: i32,
        message: &str,
    );

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

/// Forwards everything to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage_started(&self, stage: &str) {
        tracing::info!(stage, "---{stage}");
    }

    fn stage_finished(
        &self,
        stage: &str,
        elapsed: Duration,
        outcome: StageOutcome,
        status: i32,
        message: &str,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        let took = crate::timing::format_elapsed(elapsed);
        match outcome {
            StageOutcome::Succeeded => {
                tracing::info!(stage, elapsed_ms, status, "{took} {stage} status:{status} msg:{message}")
            }
            StageOutcome::Tolerated => {
                tracing::warn!(stage, elapsed_ms, status, "{took} {stage} status:{status} msg:{message}")
            }
            StageOutcome::Failed => {
                tracing::error!(stage, elapsed_ms, status, "{took} {stage} status:{status} msg:{message}")
            }
        }
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage_started(&self, _: &str) {}
    fn stage_finished(&self, _: &str, _: Duration, _: StageOutcome, _: i32, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
