use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrapi::engine::{DailyAssetPolicy, DataTrailsEventsEngine, TransparencyEngine};
use scrapi::observability::NoopObserver;
use scrapi::operation::OperationStatus;
use scrapi::{EngineArgs, Resolution, Scrapi, ScrapiError};

use super::support::sample_statement;

const TOKEN_PATH: &str = "/archivist/iam/v1/appidp/token";
const ASSET: &str = "assets/5f1c";
const EVENT: &str = "assets/5f1c/events/9a2b";

fn policy() -> Arc<DailyAssetPolicy> {
    Arc::new(DailyAssetPolicy::for_date(
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
    ))
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .mount(server)
        .await;
}

async fn mount_existing_asset(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/archivist/v2/assets"))
        .and(query_param("attributes.arc_display_name", "droid_20240307"))
        .and(query_param("attributes.target_artifact", "vCon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [{"identity": ASSET}]
        })))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> (Arc<DataTrailsEventsEngine>, Scrapi) {
    mount_token(server).await;
    mount_existing_asset(server).await;
    let args = EngineArgs::new(&server.uri(), "client-id", "client-secret");
    let engine = Arc::new(DataTrailsEventsEngine::connect(&args, policy()).await);
    let scrapi = Scrapi::with_engine(engine.clone(), Arc::new(NoopObserver));
    (engine, scrapi)
}

#[tokio::test]
async fn reuses_existing_daily_asset() {
    let server = MockServer::start().await;
    let (engine, _) = connected(&server).await;
    assert!(engine.initialized());
    assert_eq!(engine.asset_id(), Some(ASSET));
}

#[tokio::test]
async fn creates_asset_when_none_matches() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/archivist/v2/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"assets": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/archivist/v2/assets"))
        .and(body_partial_json(json!({
            "behaviours": ["RecordEvidence"],
            "attributes": {"arc_display_name": "droid_20240307", "arc_display_type": "scitt_droid"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"identity": "assets/new"})))
        .expect(1)
        .mount(&server)
        .await;

    let args = EngineArgs::new(&server.uri(), "client-id", "client-secret");
    let engine = DataTrailsEventsEngine::connect(&args, policy()).await;
    assert_eq!(engine.asset_id(), Some("assets/new"));
}

#[tokio::test]
async fn asset_lookup_failure_leaves_engine_uninitialized() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/archivist/v2/assets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let args = EngineArgs::new(&server.uri(), "client-id", "client-secret");
    let engine = DataTrailsEventsEngine::connect(&args, policy()).await;
    assert!(!engine.initialized());
    assert!(engine.asset_id().is_none());
}

#[tokio::test]
async fn registers_statement_as_evidence_event() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;
    let statement = sample_statement();

    Mock::given(method("POST"))
        .and(path(format!("/archivist/v2/{ASSET}/events")))
        .and(body_partial_json(json!({
            "operation": "Record",
            "behaviour": "RecordEvidence",
            "event_attributes": {
                "issuer": "did:web:issuer.example",
                "subject": "urn:vcon:1234",
                "signed_statement": STANDARD.encode(statement.as_bytes())
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"identity": EVENT})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = scrapi.register_signed_statement(&statement).await.unwrap();
    let record = outcome.operation().unwrap();
    assert_eq!(record.operation_id, EVENT);
    assert_eq!(record.status, OperationStatus::Running);
}

#[tokio::test]
async fn rejected_event_is_a_validation_problem() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/archivist/v2/{ASSET}/events")))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let outcome = scrapi
        .register_signed_statement(&sample_statement())
        .await
        .unwrap();
    let problem = outcome.problem().unwrap();
    assert_eq!(problem.title, "Registration Error");
    assert_eq!(problem.response_code, 400);
}

#[tokio::test]
async fn confirmed_event_is_its_own_entry() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/archivist/v2/{EVENT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identity": EVENT,
            "confirmation_status": "CONFIRMED"
        })))
        .mount(&server)
        .await;

    let outcome = scrapi.check_registration(EVENT).await.unwrap();
    let record = outcome.operation().unwrap();
    assert_eq!(record.status, OperationStatus::Succeeded);
    assert_eq!(record.entry_id.as_deref(), Some(EVENT));
}

#[tokio::test]
async fn pending_event_is_running() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/archivist/v2/{EVENT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identity": EVENT,
            "confirmation_status": "PENDING"
        })))
        .mount(&server)
        .await;

    let outcome = scrapi.check_registration(EVENT).await.unwrap();
    assert_eq!(outcome.operation().unwrap().status, OperationStatus::Running);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/archivist/v2/assets/5f1c/events/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = scrapi
        .check_registration("assets/5f1c/events/missing")
        .await
        .unwrap();
    assert_eq!(outcome.problem().unwrap().response_code, 404);
}

#[tokio::test]
async fn mismatched_event_identity_is_malformed() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/archivist/v2/{EVENT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identity": "assets/5f1c/events/other",
            "confirmation_status": "CONFIRMED"
        })))
        .mount(&server)
        .await;

    let err = scrapi.check_registration(EVENT).await.unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("assets/5f1c/events/other"));
}

#[tokio::test]
async fn resolves_statement_from_event_attribute() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;
    let statement = sample_statement();

    Mock::given(method("GET"))
        .and(path(format!("/archivist/v2/{EVENT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identity": EVENT,
            "confirmation_status": "CONFIRMED",
            "event_attributes": {"signed_statement": STANDARD.encode(statement.as_bytes())}
        })))
        .mount(&server)
        .await;

    let resolved = scrapi
        .resolve_signed_statement(EVENT)
        .await
        .unwrap()
        .into_option()
        .unwrap();
    assert_eq!(resolved, statement);
}

#[tokio::test]
async fn event_without_statement_is_invalid_request() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/archivist/v2/{EVENT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identity": EVENT,
            "event_attributes": {"arc_display_name": "something else"}
        })))
        .mount(&server)
        .await;

    let resolution = scrapi.resolve_signed_statement(EVENT).await.unwrap();
    let Resolution::Error(problem) = resolution else {
        panic!("expected problem details");
    };
    assert_eq!(problem.title, "Invalid Request");
    assert_eq!(problem.response_code, 400);
}

#[tokio::test]
async fn receipts_are_unsupported() {
    let server = MockServer::start().await;
    let (_, scrapi) = connected(&server).await;

    let err = scrapi.resolve_receipt(EVENT).await.unwrap_err();
    assert!(matches!(
        err,
        ScrapiError::UnsupportedOperation { ref engine, .. } if engine == "DataTrailsEvents"
    ));
}
