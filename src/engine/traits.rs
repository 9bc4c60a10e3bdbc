use crate::problem::ProblemDetails;
use crate::statement::{Receipt, SignedStatement};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Every engine operation either succeeds or reports problem details; a pair
/// of nullable channels is never exposed.
pub type EngineResult<T> = Result<T, ProblemDetails>;

pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = EngineResult<T>> + Send + 'a>>;

/// Transparency service configuration document
/// (`/.well-known/transparency-configuration`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransparencyConfiguration(pub serde_json::Value);

impl TransparencyConfiguration {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("issuer").and_then(serde_json::Value::as_str)
    }
}

/// Capability contract for a transparency service backend.
///
/// Implementations translate the logical SCRAPI operations onto a concrete
/// service. They must never panic or let a transport fault escape: non-2xx
/// responses, network errors and malformed bodies are all reported as
/// [`ProblemDetails`] carrying an appropriate response code.
pub trait TransparencyEngine: Send + Sync {
    /// Engine identifier (e.g. "dummy", "DataTrails").
    fn name(&self) -> &str;

    /// Human-readable description, including the endpoint where relevant.
    fn description(&self) -> String {
        self.name().to_string()
    }

    /// Whether construction-time setup succeeded. No side effects.
    fn initialized(&self) -> bool;

    fn get_configuration(&self) -> EngineFuture<'_, TransparencyConfiguration>;

    /// Submit a statement. On success the bytes are a canonical CBOR
    /// `{operationID, status}` record.
    fn register_signed_statement<'a>(
        &'a self,
        statement: &'a SignedStatement,
    ) -> EngineFuture<'a, Vec<u8>>;

    /// Query an operation. On success the bytes are a canonical CBOR
    /// `{operationID, status, entryID?}` record.
    fn check_registration<'a>(&'a self, registration_id: &'a str) -> EngineFuture<'a, Vec<u8>>;

    fn resolve_receipt<'a>(&'a self, entry_id: &'a str) -> EngineFuture<'a, Receipt>;

    /// Return the statement exactly as the issuer submitted it.
    fn resolve_signed_statement<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> EngineFuture<'a, SignedStatement>;

    /// On-behalf signing. Engines without it report the unsupported problem.
    fn issue_signed_statement<'a>(
        &'a self,
        _statement: &'a [u8],
    ) -> EngineFuture<'a, SignedStatement> {
        Box::pin(async move {
            Err(ProblemDetails::unsupported(
                "issue_signed_statement",
                format!("{} does not offer on-behalf signing", self.name()),
            ))
        })
    }
}
