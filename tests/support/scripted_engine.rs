#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrapi::engine::{EngineFuture, EngineResult, TransparencyConfiguration, TransparencyEngine};
use scrapi::observability::{Observer, ScrapiEvent};
use scrapi::operation::{OperationStatus, OperationWire};
use scrapi::problem::ProblemDetails;
use scrapi::{Receipt, Scrapi, SignedStatement};

pub const RECEIPT_BYTES: &[u8] = b"\xd2\x84receipt";

pub fn running(operation_id: &str) -> Vec<u8> {
    OperationWire::new(operation_id, OperationStatus::Running).to_cbor()
}

pub fn succeeded(operation_id: &str, entry_id: &str) -> Vec<u8> {
    OperationWire::new(operation_id, OperationStatus::Succeeded)
        .with_entry_id(entry_id)
        .to_cbor()
}

pub fn failed(operation_id: &str) -> Vec<u8> {
    OperationWire::new(operation_id, OperationStatus::Failed).to_cbor()
}

pub fn sample_statement() -> SignedStatement {
    SignedStatement::builder()
        .issuer("did:web:issuer.example")
        .subject("urn:vcon:1234")
        .payload(b"hello".to_vec())
        .signature(vec![7; 64])
        .build()
        .expect("sample statement should encode")
}

/// Engine that replays a fixed script of register and check responses.
/// Once the check script is exhausted it keeps reporting `running`.
pub struct ScriptedEngine {
    healthy: bool,
    register: EngineResult<Vec<u8>>,
    checks: Mutex<VecDeque<EngineResult<Vec<u8>>>>,
    check_calls: AtomicUsize,
    receipt: EngineResult<Receipt>,
    register_delay: Option<Duration>,
    check_delay: Option<Duration>,
}

impl ScriptedEngine {
    pub fn new(register: EngineResult<Vec<u8>>) -> Self {
        Self {
            healthy: true,
            register,
            checks: Mutex::new(VecDeque::new()),
            check_calls: AtomicUsize::new(0),
            receipt: Ok(Receipt::new(RECEIPT_BYTES.to_vec())),
            register_delay: None,
            check_delay: None,
        }
    }

    pub fn then_check(self, response: EngineResult<Vec<u8>>) -> Self {
        self.checks
            .lock()
            .expect("check script lock")
            .push_back(response);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn with_receipt(mut self, receipt: EngineResult<Receipt>) -> Self {
        self.receipt = receipt;
        self
    }

    /// Hold every submission for `delay` before answering.
    pub fn slow_register(mut self, delay: Duration) -> Self {
        self.register_delay = Some(delay);
        self
    }

    /// Hold every status check for `delay` before answering.
    pub fn slow_checks(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

impl TransparencyEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialized(&self) -> bool {
        self.healthy
    }

    fn get_configuration(&self) -> EngineFuture<'_, TransparencyConfiguration> {
        Box::pin(async move {
            Ok(TransparencyConfiguration(serde_json::json!({
                "issuer": "scripted.example"
            })))
        })
    }

    fn register_signed_statement<'a>(
        &'a self,
        _statement: &'a SignedStatement,
    ) -> EngineFuture<'a, Vec<u8>> {
        let response = self.register.clone();
        Box::pin(async move {
            if let Some(delay) = self.register_delay {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }

    fn check_registration<'a>(&'a self, registration_id: &'a str) -> EngineFuture<'a, Vec<u8>> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.checks.lock().expect("check script lock").pop_front();
        Box::pin(async move {
            if let Some(delay) = self.check_delay {
                tokio::time::sleep(delay).await;
            }
            next.unwrap_or_else(|| Ok(running(registration_id)))
        })
    }

    fn resolve_receipt<'a>(&'a self, _entry_id: &'a str) -> EngineFuture<'a, Receipt> {
        let receipt = self.receipt.clone();
        Box::pin(async move { receipt })
    }

    fn resolve_signed_statement<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> EngineFuture<'a, SignedStatement> {
        Box::pin(async move {
            Err(ProblemDetails::not_found(format!("no entry {entry_id}")))
        })
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ScrapiEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ScrapiEvent> {
        self.events.lock().expect("event log lock").clone()
    }

    pub fn settled_states(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ScrapiEvent::PollSettled { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn retries(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ScrapiEvent::PollRetry { .. }))
            .count()
    }
}

impl Observer for RecordingObserver {
    fn record_event(&self, event: &ScrapiEvent) {
        self.events
            .lock()
            .expect("event log lock")
            .push(event.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn facade(engine: Arc<ScriptedEngine>, observer: Arc<RecordingObserver>) -> Scrapi {
    Scrapi::with_engine(engine, observer)
}
