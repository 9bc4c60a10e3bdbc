use super::traits::{Observer, ScrapiEvent};
use tracing::{debug, info, warn};

/// Observer that forwards events to `tracing`.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ScrapiEvent) {
        match event {
            ScrapiEvent::EngineCheck { engine, healthy } => {
                debug!(engine = %engine, healthy = healthy, "engine.check");
            }
            ScrapiEvent::Problem { operation, problem } => {
                warn!(
                    operation = operation,
                    problem_type = %problem.problem_type,
                    response_code = problem.response_code,
                    detail = %problem.detail,
                    "scrapi.problem"
                );
            }
            ScrapiEvent::RegistrationSubmitted { operation_id } => {
                info!(operation_id = %operation_id, "registration.submitted");
            }
            ScrapiEvent::PollAttempt {
                operation_id,
                attempt,
                status,
            } => {
                debug!(operation_id = %operation_id, attempt = attempt, status = ?status, "poll.attempt");
            }
            ScrapiEvent::PollRetry {
                operation_id,
                attempt,
                reason,
            } => {
                info!(operation_id = %operation_id, attempt = attempt, reason = %reason, "poll.retry");
            }
            ScrapiEvent::PollSettled {
                operation_id,
                state,
                attempts,
                elapsed,
            } => {
                let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                info!(
                    operation_id = ?operation_id,
                    state = state,
                    attempts = attempts,
                    duration_ms = ms,
                    "poll.settled"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
