//! Client-side long-running-operation poller.
//!
//! Drives one registration through
//! `Registering -> Polling -> {Succeeded | Failed | Aborted | TimedOut}`.
//! Every wait is bounded by the [`PollPolicy`] and interruptible through a
//! [`CancellationToken`].

use crate::error::{ConfigError, Result, ScrapiError};
use crate::observability::{Observer, ScrapiEvent};
use crate::operation::{OperationRecord, OperationStatus, RegistrationOutcome, Resolution};
use crate::problem::ProblemDetails;
use crate::scrapi::Scrapi;
use crate::statement::{Receipt, SignedStatement};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, IntoStaticStr};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often and for how long to poll. At least one of `max_attempts` or
/// `timeout` is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(
        interval: Duration,
        max_attempts: Option<u32>,
        timeout: Option<Duration>,
    ) -> std::result::Result<Self, ConfigError> {
        if max_attempts.is_none() && timeout.is_none() {
            return Err(ConfigError::UnboundedPolling);
        }
        Ok(Self {
            interval,
            max_attempts,
            timeout,
        })
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: Some(max_attempts),
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: None,
            timeout: Some(timeout),
        }
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    Registering,
    Polling,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Registering | Self::Polling)
    }
}

#[derive(Debug)]
pub enum AbortReason {
    /// The service rejected the registration itself.
    Rejected(ProblemDetails),
    Error(ScrapiError),
    Cancelled,
}

/// Terminal state of one poll run.
#[derive(Debug)]
pub enum PollOutcome {
    Succeeded {
        operation_id: String,
        entry_id: String,
        attempts: u32,
    },
    Failed {
        operation_id: String,
        problem: Option<ProblemDetails>,
        attempts: u32,
    },
    Aborted {
        operation_id: Option<String>,
        reason: AbortReason,
        attempts: u32,
    },
    /// The policy ran out. `operation_id` is `None` when the deadline passed
    /// before the service accepted the submission.
    TimedOut {
        operation_id: Option<String>,
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            Self::Succeeded { .. } => PollState::Succeeded,
            Self::Failed { .. } => PollState::Failed,
            Self::Aborted { .. } => PollState::Aborted,
            Self::TimedOut { .. } => PollState::TimedOut,
        }
    }

    pub fn operation_id(&self) -> Option<&str> {
        match self {
            Self::Succeeded { operation_id, .. }
            | Self::Failed { operation_id, .. } => Some(operation_id),
            Self::Aborted { operation_id, .. } | Self::TimedOut { operation_id, .. } => {
                operation_id.as_deref()
            }
        }
    }

    pub fn entry_id(&self) -> Option<&str> {
        match self {
            Self::Succeeded { entry_id, .. } => Some(entry_id),
            _ => None,
        }
    }

    /// Number of status checks issued.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Aborted { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Result of [`RegistrationPoller::run_to_receipt`].
///
/// The poll outcome is always kept, so a receipt lookup that fails still
/// leaves the caller with the entry ID.
#[derive(Debug)]
pub struct SyncRegistration {
    pub outcome: PollOutcome,
    /// Present only when the registration succeeded.
    pub receipt: Option<Result<Resolution<Receipt>>>,
}

impl SyncRegistration {
    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.receipt {
            Some(Ok(Resolution::Resolved(receipt))) => Some(receipt),
            _ => None,
        }
    }
}

enum Step {
    Settled(PollOutcome),
    Retry(String),
}

/// How a service call raced against cancellation and the deadline.
enum Call<T> {
    Done(T),
    Cancelled,
    Expired,
}

pub struct RegistrationPoller<'a> {
    scrapi: &'a Scrapi,
    policy: PollPolicy,
    observer: Arc<dyn Observer>,
}

impl<'a> RegistrationPoller<'a> {
    /// Poll through `scrapi`, reporting to the façade's own observer.
    pub fn new(scrapi: &'a Scrapi, policy: PollPolicy) -> Self {
        Self {
            scrapi,
            policy,
            observer: Arc::clone(scrapi.observer()),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Submit `statement` and poll it to a terminal state.
    pub async fn run(&self, statement: &SignedStatement, cancel: &CancellationToken) -> PollOutcome {
        let started = Instant::now();
        let deadline = self.deadline(started);

        let submitted = tokio::select! {
            biased;
            () = cancel.cancelled() => Call::Cancelled,
            () = until(deadline) => Call::Expired,
            result = self.scrapi.register_signed_statement(statement) => Call::Done(result),
        };
        let record = match submitted {
            Call::Cancelled => {
                return self.settle(aborted(None, AbortReason::Cancelled, 0), started);
            }
            Call::Expired => {
                let outcome = PollOutcome::TimedOut {
                    operation_id: None,
                    attempts: 0,
                };
                return self.settle(outcome, started);
            }
            Call::Done(Ok(RegistrationOutcome::Operation(record))) => record,
            Call::Done(Ok(RegistrationOutcome::Error(problem))) => {
                return self.settle(aborted(None, AbortReason::Rejected(problem), 0), started);
            }
            Call::Done(Err(e)) => {
                return self.settle(aborted(None, AbortReason::Error(e), 0), started);
            }
        };

        // Some services answer the submission with a finished operation.
        if let Some(outcome) = terminal_outcome(&record, 0) {
            return self.settle(outcome, started);
        }

        self.poll_from(record.operation_id, cancel, started, deadline)
            .await
    }

    /// Poll an operation that was submitted earlier.
    pub async fn poll(&self, operation_id: &str, cancel: &CancellationToken) -> PollOutcome {
        let started = Instant::now();
        self.poll_from(operation_id.to_string(), cancel, started, self.deadline(started))
            .await
    }

    /// [`run`](Self::run), then fetch the receipt of a successful registration.
    pub async fn run_to_receipt(
        &self,
        statement: &SignedStatement,
        cancel: &CancellationToken,
    ) -> SyncRegistration {
        let outcome = self.run(statement, cancel).await;
        let receipt = match outcome.entry_id() {
            Some(entry_id) => Some(self.scrapi.resolve_receipt(entry_id).await),
            None => None,
        };
        SyncRegistration { outcome, receipt }
    }

    /// A timeout too large to represent as an instant is no deadline at all.
    fn deadline(&self, started: Instant) -> Option<Instant> {
        self.policy
            .timeout
            .and_then(|timeout| started.checked_add(timeout))
    }

    async fn poll_from(
        &self,
        operation_id: String,
        cancel: &CancellationToken,
        started: Instant,
        deadline: Option<Instant>,
    ) -> PollOutcome {
        let mut attempts = 0u32;

        loop {
            let exhausted = self.policy.max_attempts.is_some_and(|max| attempts >= max)
                || deadline.is_some_and(|deadline| Instant::now() >= deadline);
            if exhausted {
                let outcome = PollOutcome::TimedOut {
                    operation_id: Some(operation_id),
                    attempts,
                };
                return self.settle(outcome, started);
            }

            attempts += 1;
            let checked = tokio::select! {
                biased;
                () = cancel.cancelled() => Call::Cancelled,
                () = until(deadline) => Call::Expired,
                result = self.scrapi.check_registration(&operation_id) => Call::Done(result),
            };
            let checked = match checked {
                Call::Done(checked) => checked,
                Call::Cancelled => {
                    let outcome = aborted(Some(operation_id), AbortReason::Cancelled, attempts);
                    return self.settle(outcome, started);
                }
                Call::Expired => {
                    let outcome = PollOutcome::TimedOut {
                        operation_id: Some(operation_id),
                        attempts,
                    };
                    return self.settle(outcome, started);
                }
            };

            let reason = match self.classify(&operation_id, attempts, checked) {
                Step::Settled(outcome) => return self.settle(outcome, started),
                Step::Retry(reason) => reason,
            };
            self.observer.record_event(&ScrapiEvent::PollRetry {
                operation_id: operation_id.clone(),
                attempt: attempts,
                reason,
            });

            let mut pause = self.policy.interval;
            if let Some(deadline) = deadline {
                pause = pause.min(deadline.saturating_duration_since(Instant::now()));
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    let outcome = aborted(Some(operation_id), AbortReason::Cancelled, attempts);
                    return self.settle(outcome, started);
                }
                () = tokio::time::sleep(pause) => {}
            }
        }
    }

    fn classify(
        &self,
        operation_id: &str,
        attempts: u32,
        checked: Result<RegistrationOutcome>,
    ) -> Step {
        match checked {
            Ok(RegistrationOutcome::Operation(record)) => {
                self.observer.record_event(&ScrapiEvent::PollAttempt {
                    operation_id: operation_id.to_string(),
                    attempt: attempts,
                    status: Some(record.status),
                });
                match terminal_outcome(&record, attempts) {
                    Some(outcome) => Step::Settled(outcome),
                    None => Step::Retry(OperationStatus::Running.to_string()),
                }
            }
            Ok(RegistrationOutcome::Error(problem)) if problem.is_transient() => {
                self.record_unknown_attempt(operation_id, attempts);
                Step::Retry(problem.to_string())
            }
            Ok(RegistrationOutcome::Error(problem)) => {
                self.record_unknown_attempt(operation_id, attempts);
                Step::Settled(PollOutcome::Failed {
                    operation_id: operation_id.to_string(),
                    problem: Some(problem),
                    attempts,
                })
            }
            Err(e) if e.is_malformed() => {
                self.record_unknown_attempt(operation_id, attempts);
                Step::Retry(e.to_string())
            }
            Err(e) => Step::Settled(aborted(
                Some(operation_id.to_string()),
                AbortReason::Error(e),
                attempts,
            )),
        }
    }

    fn record_unknown_attempt(&self, operation_id: &str, attempts: u32) {
        self.observer.record_event(&ScrapiEvent::PollAttempt {
            operation_id: operation_id.to_string(),
            attempt: attempts,
            status: None,
        });
    }

    fn settle(&self, outcome: PollOutcome, started: Instant) -> PollOutcome {
        let state: &'static str = outcome.state().into();
        self.observer.record_event(&ScrapiEvent::PollSettled {
            operation_id: outcome.operation_id().map(str::to_string),
            state,
            attempts: outcome.attempts(),
            elapsed: started.elapsed(),
        });
        outcome
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn aborted(operation_id: Option<String>, reason: AbortReason, attempts: u32) -> PollOutcome {
    PollOutcome::Aborted {
        operation_id,
        reason,
        attempts,
    }
}

fn terminal_outcome(record: &OperationRecord, attempts: u32) -> Option<PollOutcome> {
    match (record.status, &record.entry_id) {
        (OperationStatus::Succeeded, Some(entry_id)) => Some(PollOutcome::Succeeded {
            operation_id: record.operation_id.clone(),
            entry_id: entry_id.clone(),
            attempts,
        }),
        (OperationStatus::Failed, _) => Some(PollOutcome::Failed {
            operation_id: record.operation_id.clone(),
            problem: None,
            attempts,
        }),
        _ => None,
    }
}
