//! DataTrails adapter for the public SCITT endpoints.

use super::auth::TokenSource;
use super::http_client::{HttpReply, build_engine_client, send};
use super::normalize::{decode_document, normalize_operation, problem_from_response};
use super::traits::{EngineFuture, EngineResult, TransparencyConfiguration, TransparencyEngine};
use crate::config::EngineArgs;
use crate::operation::{OperationStatus, OperationWire};
use crate::problem::ProblemDetails;
use crate::statement::{Receipt, SignedStatement};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

const SCITT_PREFIX: &str = "/archivist/v1/publicscitt";
const CONFIGURATION_PATH: &str = "/.well-known/transparency-configuration";
const COSE_CONTENT_TYPE: &str = "application/cose";

pub struct DataTrailsEngine {
    base_url: String,
    client: Client,
    tokens: TokenSource,
    initialized: bool,
}

impl DataTrailsEngine {
    /// Build the engine and acquire an access token. A failed token request
    /// leaves the engine constructed but not initialized.
    pub async fn connect(args: &EngineArgs) -> Self {
        let mut engine = Self::unconnected(args);
        match engine.tokens.bearer().await {
            Ok(_) => engine.initialized = true,
            Err(problem) => {
                tracing::warn!(
                    url = %engine.base_url,
                    response_code = problem.response_code,
                    "DataTrails authentication failed: {problem}"
                );
            }
        }
        engine
    }

    fn unconnected(args: &EngineArgs) -> Self {
        let base_url = args.url.trim_end_matches('/').to_string();
        let client = build_engine_client();
        let tokens = TokenSource::new(
            client.clone(),
            &base_url,
            &args.client_id,
            &args.client_secret,
        );
        Self {
            base_url,
            client,
            tokens,
            initialized: false,
        }
    }

    fn scitt_url(&self, path: &str) -> String {
        format!("{}{SCITT_PREFIX}{path}", self.base_url)
    }

    async fn get(&self, path: &str) -> EngineResult<HttpReply> {
        let token = self.tokens.bearer().await?;
        send(self.client.get(self.scitt_url(path)).bearer_auth(token)).await
    }

    async fn get_ok(&self, path: &str) -> EngineResult<Vec<u8>> {
        let reply = self.get(path).await?;
        if !reply.is_success() {
            return Err(problem_from_response(reply.status, &reply.body));
        }
        Ok(reply.body)
    }
}

impl TransparencyEngine for DataTrailsEngine {
    fn name(&self) -> &str {
        "DataTrails"
    }

    fn description(&self) -> String {
        format!("DataTrails SCRAPI Engine ({})", self.base_url)
    }

    fn initialized(&self) -> bool {
        self.initialized
    }

    fn get_configuration(&self) -> EngineFuture<'_, TransparencyConfiguration> {
        Box::pin(async move {
            let url = format!("{}{CONFIGURATION_PATH}", self.base_url);
            let reply = send(self.client.get(url)).await?;
            if !reply.is_success() {
                return Err(problem_from_response(reply.status, &reply.body));
            }
            decode_document(&reply.body)
                .map(TransparencyConfiguration)
                .ok_or_else(|| ProblemDetails::malformed("transparency configuration is not a map"))
        })
    }

    fn register_signed_statement<'a>(
        &'a self,
        statement: &'a SignedStatement,
    ) -> EngineFuture<'a, Vec<u8>> {
        Box::pin(async move {
            tracing::debug!(issuer = ?statement.issuer(), "registering signed statement");
            let token = self.tokens.bearer().await?;
            let request = self
                .client
                .post(self.scitt_url("/entries"))
                .bearer_auth(token)
                .header(CONTENT_TYPE, COSE_CONTENT_TYPE)
                .body(statement.as_bytes().to_vec());
            let reply = send(request).await?;
            if !reply.is_success() {
                return Err(problem_from_response(reply.status, &reply.body));
            }
            normalize_operation(&reply.body)
        })
    }

    fn check_registration<'a>(&'a self, registration_id: &'a str) -> EngineFuture<'a, Vec<u8>> {
        Box::pin(async move {
            tracing::debug!(operation_id = registration_id, "checking on operation");
            let reply = self.get(&format!("/operations/{registration_id}")).await?;

            // The public endpoint answers 400 for operations that have not yet
            // crossed the sharing boundary.
            if reply.status == 400 {
                tracing::debug!(
                    operation_id = registration_id,
                    "suspected propagation delay, reporting running"
                );
                return Ok(OperationWire::new(registration_id, OperationStatus::Running).to_cbor());
            }
            if !reply.is_success() {
                return Err(problem_from_response(reply.status, &reply.body));
            }
            normalize_operation(&reply.body)
        })
    }

    fn resolve_receipt<'a>(&'a self, entry_id: &'a str) -> EngineFuture<'a, Receipt> {
        Box::pin(async move {
            tracing::debug!(entry_id, "resolving receipt");
            let body = self.get_ok(&format!("/entries/{entry_id}/receipt")).await?;
            if body.is_empty() {
                return Err(ProblemDetails::malformed("empty receipt"));
            }
            Ok(Receipt::new(body))
        })
    }

    fn resolve_signed_statement<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> EngineFuture<'a, SignedStatement> {
        Box::pin(async move {
            tracing::debug!(entry_id, "resolving entry");
            let body = self.get_ok(&format!("/entries/{entry_id}")).await?;

            // The service hands back its counter-signed envelope; the issuer's
            // statement is its payload.
            let counter_signed = SignedStatement::from_bytes(body).map_err(|e| {
                ProblemDetails::malformed(format!("entry {entry_id} is not a signed statement: {e}"))
            })?;
            counter_signed.unwrap_envelope().map_err(|e| {
                ProblemDetails::malformed(format!("entry {entry_id} does not wrap a statement: {e}"))
            })
        })
    }
}
