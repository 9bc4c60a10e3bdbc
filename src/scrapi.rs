//! Portable SCRAPI façade.
//!
//! [`Scrapi`] owns one transparency engine and exposes the logical SCRAPI
//! operations on top of it. Backend-reported problems come back as data;
//! only configuration faults, unsupported operations and backend contract
//! violations surface as [`ScrapiError`].

use crate::config::{EngineArgs, ScrapiConfig};
use crate::engine::{
    EngineResult, TransparencyConfiguration, TransparencyEngine, create_engine,
};
use crate::error::{ConfigError, Result, ScrapiError};
use crate::observability::{Observer, ScrapiEvent};
use crate::operation::{OperationRecord, RegistrationOutcome, Resolution};
use crate::poller::{PollPolicy, RegistrationPoller, SyncRegistration};
use crate::statement::{Receipt, SignedStatement};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Scrapi {
    engine: Option<Arc<dyn TransparencyEngine>>,
    observer: Arc<dyn Observer>,
}

impl Scrapi {
    /// Construct the engine registered for `engine_type` (`"dummy"`,
    /// `"DataTrails"`, ...).
    pub async fn new(
        engine_type: &str,
        args: &EngineArgs,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        let engine = create_engine(engine_type, args).await?;
        Ok(Self::with_engine(engine, observer))
    }

    pub async fn from_config(config: &ScrapiConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        config.validate()?;
        Self::new(&config.engine, &config.connection, observer).await
    }

    pub fn with_engine(engine: Arc<dyn TransparencyEngine>, observer: Arc<dyn Observer>) -> Self {
        Self {
            engine: Some(engine),
            observer,
        }
    }

    /// A façade with no engine; every operation fails until one is set.
    pub fn unconfigured(observer: Arc<dyn Observer>) -> Self {
        Self {
            engine: None,
            observer,
        }
    }

    pub fn set_engine(&mut self, engine: Arc<dyn TransparencyEngine>) {
        self.engine = Some(engine);
    }

    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Gate for every operation that needs a live transparency service.
    pub fn check_engine(&self) -> Result<&dyn TransparencyEngine> {
        let engine = self.engine.as_deref().ok_or(ConfigError::EngineNotConfigured)?;
        let healthy = engine.initialized();
        self.observer.record_event(&ScrapiEvent::EngineCheck {
            engine: engine.name().to_string(),
            healthy,
        });
        if !healthy {
            return Err(ConfigError::EngineUnhealthy {
                engine: engine.name().to_string(),
            }
            .into());
        }
        Ok(engine)
    }

    pub async fn get_configuration(&self) -> Result<Resolution<TransparencyConfiguration>> {
        let engine = self.check_engine()?;
        let result = engine.get_configuration().await;
        self.settle("get_configuration", engine, result)
    }

    /// Submit a signed statement. On success the outcome carries the
    /// operation ID to poll with.
    pub async fn register_signed_statement(
        &self,
        statement: &SignedStatement,
    ) -> Result<RegistrationOutcome> {
        let engine = self.check_engine()?;
        let result = engine.register_signed_statement(statement).await;
        let outcome = self.operation_outcome("register_signed_statement", engine, result)?;
        if let RegistrationOutcome::Operation(record) = &outcome {
            self.observer.record_event(&ScrapiEvent::RegistrationSubmitted {
                operation_id: record.operation_id.clone(),
            });
        }
        Ok(outcome)
    }

    pub async fn check_registration(&self, registration_id: &str) -> Result<RegistrationOutcome> {
        let engine = self.check_engine()?;
        let result = engine.check_registration(registration_id).await;
        self.operation_outcome("check_registration", engine, result)
    }

    pub async fn resolve_receipt(&self, entry_id: &str) -> Result<Resolution<Receipt>> {
        let engine = self.check_engine()?;
        let result = engine.resolve_receipt(entry_id).await;
        self.settle("resolve_receipt", engine, result)
    }

    pub async fn resolve_signed_statement(
        &self,
        entry_id: &str,
    ) -> Result<Resolution<SignedStatement>> {
        let engine = self.check_engine()?;
        let result = engine.resolve_signed_statement(entry_id).await;
        self.settle("resolve_signed_statement", engine, result)
    }

    /// Have the service sign `statement` (the to-be-signed bytes of a
    /// COSE_Sign1) with a key it holds.
    pub async fn issue_signed_statement(
        &self,
        statement: &[u8],
    ) -> Result<Resolution<SignedStatement>> {
        let engine = self.check_engine()?;
        let result = engine.issue_signed_statement(statement).await;
        self.settle("issue_signed_statement", engine, result)
    }

    /// Register, poll until settled, then fetch the receipt.
    ///
    /// On some services this can take minutes; `policy` bounds the wait and
    /// `cancel` abandons it early. The poll outcome is returned even when the
    /// receipt lookup fails.
    pub async fn register_signed_statement_sync(
        &self,
        statement: &SignedStatement,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> SyncRegistration {
        RegistrationPoller::new(self, policy)
            .run_to_receipt(statement, cancel)
            .await
    }

    /// An operation body the engine could not parse is a contract violation,
    /// the same as a parsed record with a missing field.
    fn operation_outcome(
        &self,
        operation: &'static str,
        engine: &dyn TransparencyEngine,
        result: EngineResult<Vec<u8>>,
    ) -> Result<RegistrationOutcome> {
        if let Err(problem) = &result
            && problem.is_malformed()
        {
            self.observer.record_event(&ScrapiEvent::Problem {
                operation,
                problem: problem.clone(),
            });
            return Err(ScrapiError::MalformedBackendResponse(problem.detail.clone()));
        }
        match self.settle(operation, engine, result)? {
            Resolution::Error(problem) => Ok(RegistrationOutcome::Error(problem)),
            Resolution::Resolved(bytes) => {
                Ok(RegistrationOutcome::Operation(OperationRecord::decode(&bytes)?))
            }
        }
    }

    /// Unsupported operations are raised; every other problem is recorded and
    /// handed back as data.
    fn settle<T>(
        &self,
        operation: &'static str,
        engine: &dyn TransparencyEngine,
        result: EngineResult<T>,
    ) -> Result<Resolution<T>> {
        match result {
            Ok(value) => Ok(Resolution::Resolved(value)),
            Err(problem) if problem.is_unsupported() => Err(ScrapiError::UnsupportedOperation {
                operation: operation.to_string(),
                engine: engine.name().to_string(),
            }),
            Err(problem) => {
                self.observer.record_event(&ScrapiEvent::Problem {
                    operation,
                    problem: problem.clone(),
                });
                Ok(Resolution::Error(problem))
            }
        }
    }
}

impl fmt::Display for Scrapi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.engine {
            Some(engine) => f.write_str(&engine.description()),
            None => f.write_str("Scrapi (uninitialized)"),
        }
    }
}
