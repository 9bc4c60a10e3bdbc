use std::sync::Arc;

use scrapi::observability::{NoopObserver, ScrapiEvent};
use scrapi::problem::ProblemDetails;
use scrapi::{ConfigError, OperationStatus, Resolution, Scrapi, ScrapiError};

use super::support::{RecordingObserver, ScriptedEngine, facade, running, sample_statement};

#[tokio::test]
async fn every_operation_requires_an_engine() {
    let scrapi = Scrapi::unconfigured(Arc::new(NoopObserver));

    let err = scrapi.resolve_receipt("e-1").await.unwrap_err();
    assert!(matches!(
        err,
        ScrapiError::Config(ConfigError::EngineNotConfigured)
    ));
    let err = scrapi
        .register_signed_statement(&sample_statement())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn problems_are_recorded_and_returned() {
    let engine = Arc::new(ScriptedEngine::new(Err(ProblemDetails::from_status(
        403,
        "forbidden issuer",
    ))));
    let observer = Arc::new(RecordingObserver::default());
    let scrapi = facade(engine, Arc::clone(&observer));

    let outcome = scrapi
        .register_signed_statement(&sample_statement())
        .await
        .unwrap();
    assert_eq!(outcome.problem().unwrap().response_code, 403);
    assert!(outcome.operation().is_none());

    let events = observer.events();
    assert!(events.iter().any(|event| matches!(
        event,
        ScrapiEvent::Problem { operation: "register_signed_statement", problem } if problem.response_code == 403
    )));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, ScrapiEvent::RegistrationSubmitted { .. }))
    );
}

#[tokio::test]
async fn successful_submission_is_recorded() {
    let engine = Arc::new(ScriptedEngine::new(Ok(running("op-5"))));
    let observer = Arc::new(RecordingObserver::default());
    let scrapi = facade(engine, Arc::clone(&observer));

    let outcome = scrapi
        .register_signed_statement(&sample_statement())
        .await
        .unwrap();
    assert_eq!(outcome.operation().unwrap().status, OperationStatus::Running);
    assert!(observer.events().iter().any(|event| matches!(
        event,
        ScrapiEvent::RegistrationSubmitted { operation_id } if operation_id == "op-5"
    )));
    assert!(observer.events().iter().any(|event| matches!(
        event,
        ScrapiEvent::EngineCheck { healthy: true, .. }
    )));
}

#[tokio::test]
async fn configuration_and_statement_lookups() {
    let engine = Arc::new(ScriptedEngine::new(Ok(running("op-1"))));
    let scrapi = facade(engine, Arc::new(RecordingObserver::default()));

    let configuration = scrapi.get_configuration().await.unwrap().into_option().unwrap();
    assert_eq!(configuration.issuer(), Some("scripted.example"));

    let resolution = scrapi.resolve_signed_statement("e-404").await.unwrap();
    assert!(matches!(resolution, Resolution::Error(ref p) if p.response_code == 404));

    let err = scrapi.issue_signed_statement(b"tbs").await.unwrap_err();
    assert!(matches!(err, ScrapiError::UnsupportedOperation { .. }));
}

#[test]
fn display_names_the_engine() {
    let scrapi = facade(
        Arc::new(ScriptedEngine::new(Ok(running("op-1")))),
        Arc::new(RecordingObserver::default()),
    );
    assert_eq!(scrapi.to_string(), "scripted");
}
