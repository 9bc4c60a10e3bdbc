//! DataTrails adapter that records statements as native events.
//!
//! Each statement becomes an evidence event on an asset chosen by an
//! [`AttributePolicy`]; the event identity doubles as operation and entry ID.

use super::attributes::{AttributePolicy, SIGNED_STATEMENT_ATTRIBUTE};
use super::auth::TokenSource;
use super::http_client::{HttpReply, build_engine_client, send};
use super::normalize::problem_from_response;
use super::traits::{EngineFuture, EngineResult, TransparencyConfiguration, TransparencyEngine};
use crate::config::EngineArgs;
use crate::operation::{OperationStatus, OperationWire};
use crate::problem::{PROBLEM_VALIDATION, ProblemDetails};
use crate::statement::{Receipt, SignedStatement};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const ARCHIVIST_V2: &str = "/archivist/v2";

#[derive(Debug, Deserialize)]
struct Identity {
    identity: String,
}

#[derive(Debug, Deserialize)]
struct AssetList {
    #[serde(default)]
    assets: Vec<Identity>,
}

#[derive(Debug, Deserialize)]
struct Event {
    identity: String,
    #[serde(default)]
    confirmation_status: String,
    #[serde(default)]
    event_attributes: Map<String, Value>,
}

impl Event {
    fn status(&self) -> OperationStatus {
        match self.confirmation_status.as_str() {
            "CONFIRMED" | "COMMITTED" => OperationStatus::Succeeded,
            "FAILED" => OperationStatus::Failed,
            _ => OperationStatus::Running,
        }
    }
}

pub struct DataTrailsEventsEngine {
    base_url: String,
    client: Client,
    tokens: TokenSource,
    policy: Arc<dyn AttributePolicy>,
    asset_id: Option<String>,
}

impl DataTrailsEventsEngine {
    /// Authenticate and make sure the policy's target asset exists. Any
    /// failure leaves the engine uninitialized.
    pub async fn connect(args: &EngineArgs, policy: Arc<dyn AttributePolicy>) -> Self {
        let base_url = args.url.trim_end_matches('/').to_string();
        let client = build_engine_client();
        let tokens = TokenSource::new(
            client.clone(),
            &base_url,
            &args.client_id,
            &args.client_secret,
        );
        let mut engine = Self {
            base_url,
            client,
            tokens,
            policy,
            asset_id: None,
        };

        match engine.ensure_asset().await {
            Ok(asset_id) => {
                tracing::debug!(asset_id = %asset_id, policy = engine.policy.name(), "target asset ready");
                engine.asset_id = Some(asset_id);
            }
            Err(problem) => {
                tracing::warn!(
                    url = %engine.base_url,
                    response_code = problem.response_code,
                    "DataTrails events engine setup failed: {problem}"
                );
            }
        }
        engine
    }

    pub fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{ARCHIVIST_V2}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn ensure_asset(&self) -> EngineResult<String> {
        let spec = self.policy.asset();
        let token = self.tokens.bearer().await?;

        let query: Vec<(String, String)> = spec
            .selector
            .iter()
            .filter_map(|key| {
                spec.attributes
                    .get(key)
                    .map(|value| (format!("attributes.{key}"), value.clone()))
            })
            .collect();
        let reply = send(
            self.client
                .get(self.url("assets"))
                .bearer_auth(&token)
                .query(&query),
        )
        .await?;
        if !reply.is_success() {
            return Err(problem_from_response(reply.status, &reply.body));
        }
        let existing: AssetList = parse_json(&reply)?;
        if let Some(asset) = existing.assets.into_iter().next() {
            return Ok(asset.identity);
        }

        let body = json!({
            "behaviours": spec.behaviours,
            "attributes": spec.attributes,
        });
        let reply = send(
            self.client
                .post(self.url("assets"))
                .bearer_auth(&token)
                .json(&body),
        )
        .await?;
        if !reply.is_success() {
            return Err(problem_from_response(reply.status, &reply.body));
        }
        let created: Identity = parse_json(&reply)?;
        Ok(created.identity)
    }

    async fn read_event(&self, event_id: &str) -> EngineResult<Event> {
        let token = self.tokens.bearer().await?;
        let reply = send(self.client.get(self.url(event_id)).bearer_auth(token)).await?;
        if matches!(reply.status, 400 | 404) {
            return Err(ProblemDetails::not_found(format!(
                "operation {event_id} was not found as a DataTrails event"
            ))
            .with_instance(event_id));
        }
        if !reply.is_success() {
            return Err(problem_from_response(reply.status, &reply.body));
        }

        let event: Event = parse_json(&reply)?;
        if event.identity != event_id {
            return Err(ProblemDetails::malformed(format!(
                "requested event {event_id} but received {}",
                event.identity
            )));
        }
        Ok(event)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(reply: &HttpReply) -> EngineResult<T> {
    serde_json::from_slice(&reply.body)
        .map_err(|e| ProblemDetails::malformed(format!("unexpected DataTrails response: {e}")))
}

impl TransparencyEngine for DataTrailsEventsEngine {
    fn name(&self) -> &str {
        "DataTrailsEvents"
    }

    fn description(&self) -> String {
        format!("DataTrails SCRAPI Events Engine ({})", self.base_url)
    }

    fn initialized(&self) -> bool {
        self.asset_id.is_some()
    }

    fn get_configuration(&self) -> EngineFuture<'_, TransparencyConfiguration> {
        Box::pin(async move {
            Err(ProblemDetails::unsupported(
                "get_configuration",
                "the events engine has no transparency configuration",
            ))
        })
    }

    fn register_signed_statement<'a>(
        &'a self,
        statement: &'a SignedStatement,
    ) -> EngineFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let Some(asset_id) = self.asset_id.as_deref() else {
                return Err(ProblemDetails::unreachable("no target asset"));
            };
            let attrs = self.policy.lift(statement);
            tracing::debug!(asset_id, attributes = attrs.len(), "recording statement event");

            let token = self.tokens.bearer().await?;
            let body = json!({
                "operation": "Record",
                "behaviour": "RecordEvidence",
                "event_attributes": attrs,
            });
            let reply = send(
                self.client
                    .post(self.url(&format!("{asset_id}/events")))
                    .bearer_auth(token)
                    .json(&body),
            )
            .await?;
            if reply.status == 400 {
                return Err(ProblemDetails::new(
                    PROBLEM_VALIDATION,
                    "Registration Error",
                    "Payload was not accepted by DataTrails",
                    400,
                ));
            }
            if !reply.is_success() {
                return Err(problem_from_response(reply.status, &reply.body));
            }

            let event: Identity = parse_json(&reply)?;
            Ok(OperationWire::new(&event.identity, OperationStatus::Running).to_cbor())
        })
    }

    fn check_registration<'a>(&'a self, registration_id: &'a str) -> EngineFuture<'a, Vec<u8>> {
        Box::pin(async move {
            tracing::debug!(operation_id = registration_id, "checking on operation");
            let event = self.read_event(registration_id).await?;
            let status = event.status();
            let wire = OperationWire::new(registration_id, status);
            let wire = if status == OperationStatus::Succeeded {
                wire.with_entry_id(registration_id)
            } else {
                wire
            };
            Ok(wire.to_cbor())
        })
    }

    fn resolve_receipt<'a>(&'a self, entry_id: &'a str) -> EngineFuture<'a, Receipt> {
        Box::pin(async move {
            Err(ProblemDetails::unsupported(
                "resolve_receipt",
                format!("no SCITT receipt is available for native event {entry_id}"),
            ))
        })
    }

    fn resolve_signed_statement<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> EngineFuture<'a, SignedStatement> {
        Box::pin(async move {
            tracing::debug!(entry_id, "resolving entry");
            let event = self.read_event(entry_id).await?;
            let encoded = event
                .event_attributes
                .get(SIGNED_STATEMENT_ATTRIBUTE)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ProblemDetails::new(
                        PROBLEM_VALIDATION,
                        "Invalid Request",
                        "The specified event does not have a SCITT statement",
                        400,
                    )
                })?;

            let bytes = STANDARD.decode(encoded).map_err(|e| {
                ProblemDetails::malformed(format!("signed statement is not base64: {e}"))
            })?;
            SignedStatement::from_bytes(bytes)
                .map_err(|e| ProblemDetails::malformed(format!("stored statement: {e}")))
        })
    }
}
