//! Named, timed pipeline stages.

use crate::error::{PipelineError, StageFailure};
use crate::report::{Reporter, StageOutcome};
use crate::timing::Timer;

/// Run one stage: log its name, time it, log the outcome, and turn a failure
/// into a [`PipelineError::Stage`] carrying the stage name.
pub fn run_stage<T, F>(reporter: &dyn Reporter, name: &str, f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, StageFailure>,
{
    reporter.stage_started(name);
    let timer = Timer::start(name);
    let result = f();
    let elapsed = timer.finish();

    match result {
        Ok(value) => {
            reporter.stage_finished(name, elapsed, StageOutcome::Succeeded, 0, "success");
            Ok(value)
        }
        Err(failure) => {
            reporter.stage_finished(
                name,
                elapsed,
                StageOutcome::Failed,
                failure.status,
                &failure.message,
            );
            Err(PipelineError::stage(name, failure))
        }
    }
}

/// Run a best-effort stage. A failure is reported as tolerated and swallowed.
pub fn run_tolerated<T, F>(reporter: &dyn Reporter, name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, StageFailure>,
{
    reporter.stage_started(name);
    let timer = Timer::start(name);
    let result = f();
    let elapsed = timer.finish();

    match result {
        Ok(value) => {
            reporter.stage_finished(name, elapsed, StageOutcome::Succeeded, 0, "success");
            Some(value)
        }
        Err(failure) => {
            reporter.stage_finished(
                name,
                elapsed,
                StageOutcome::Tolerated,
                failure.status,
                &failure.message,
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;

    #[test]
    fn failure_carries_stage_name_and_status() {
        let err = run_stage::<(), _>(&NullReporter, "[base] link resources", || {
            Err(StageFailure::new(3, "link failed"))
        })
        .unwrap_err();

        match err {
            PipelineError::Stage {
                stage,
                status,
                message,
            } => {
                assert_eq!(stage, "[base] link resources");
                assert_eq!(status, 3);
                assert_eq!(message, "link failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tolerated_failure_is_swallowed() {
        let value = run_tolerated::<u8, _>(&NullReporter, "compile", || {
            Err(StageFailure::new(1, "nothing to compile"))
        });
        assert!(value.is_none());

        let value = run_tolerated(&NullReporter, "compile", || Ok(5u8));
        assert_eq!(value, Some(5));
    }
}
