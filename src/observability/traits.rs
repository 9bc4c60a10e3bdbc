use crate::operation::OperationStatus;
use crate::problem::ProblemDetails;
use std::time::Duration;

/// Events the façade and poller report while talking to a transparency service.
#[derive(Debug, Clone)]
pub enum ScrapiEvent {
    EngineCheck {
        engine: String,
        healthy: bool,
    },
    Problem {
        operation: &'static str,
        problem: ProblemDetails,
    },
    RegistrationSubmitted {
        operation_id: String,
    },
    PollAttempt {
        operation_id: String,
        attempt: u32,
        status: Option<OperationStatus>,
    },
    PollRetry {
        operation_id: String,
        attempt: u32,
        reason: String,
    },
    PollSettled {
        operation_id: Option<String>,
        state: &'static str,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Sink for client-side events. Injected into each component at
/// construction; nothing in the crate writes to a process-wide logger
/// configuration on its own.
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ScrapiEvent);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
