use super::traits::{EngineFuture, TransparencyConfiguration, TransparencyEngine};
use crate::problem::ProblemDetails;
use crate::statement::{Receipt, SignedStatement};

/// Engine that is always healthy and implements nothing. Useful for
/// validating configuration and exercising the façade without a network.
pub struct NullEngine;

impl NullEngine {
    pub fn new() -> Self {
        Self
    }

    fn unsupported<T: Send + 'static>(operation: &'static str) -> EngineFuture<'static, T> {
        Box::pin(async move {
            Err(ProblemDetails::unsupported(
                operation,
                "the dummy engine does not implement endpoints",
            ))
        })
    }
}

impl TransparencyEngine for NullEngine {
    fn name(&self) -> &str {
        "dummy"
    }

    fn description(&self) -> String {
        "Dummy SCRAPI Engine (does not implement endpoints!)".into()
    }

    fn initialized(&self) -> bool {
        true
    }

    fn get_configuration(&self) -> EngineFuture<'_, TransparencyConfiguration> {
        Self::unsupported("get_configuration")
    }

    fn register_signed_statement<'a>(
        &'a self,
        _statement: &'a SignedStatement,
    ) -> EngineFuture<'a, Vec<u8>> {
        Self::unsupported("register_signed_statement")
    }

    fn check_registration<'a>(&'a self, _registration_id: &'a str) -> EngineFuture<'a, Vec<u8>> {
        Self::unsupported("check_registration")
    }

    fn resolve_receipt<'a>(&'a self, _entry_id: &'a str) -> EngineFuture<'a, Receipt> {
        Self::unsupported("resolve_receipt")
    }

    fn resolve_signed_statement<'a>(
        &'a self,
        _entry_id: &'a str,
    ) -> EngineFuture<'a, SignedStatement> {
        Self::unsupported("resolve_signed_statement")
    }

    fn issue_signed_statement<'a>(
        &'a self,
        _statement: &'a [u8],
    ) -> EngineFuture<'a, SignedStatement> {
        Self::unsupported("issue_signed_statement")
    }
}
