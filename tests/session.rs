mod common;

use std::sync::Arc;

use common::{pdf_candidate, RecordingNotifier, RecordingSink, PDF_BYTES};
use serde_json::json;
use unmark_cli::{
    ApiClient, Candidate, JobError, JobState, Level, RetrievalError, ServiceConfig, Session,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn service_with_artifact() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/remove-watermark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Watermarks successfully removed!",
            "details": {
                "total_removed": 7,
                "images_removed": 4,
                "links_removed": 3,
                "output_filename": "out.pdf"
            },
            "download_url": "/files/out.pdf"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/out.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .mount(&server)
        .await;
    server
}

fn session_for(
    server: &MockServer,
    sink: Arc<RecordingSink>,
    notifier: Arc<RecordingNotifier>,
) -> Session {
    unmark_cli::logging::initialize_for_tests();
    let config = ServiceConfig {
        base_url: server.uri(),
        ..ServiceConfig::default()
    };
    Session::new(Arc::new(ApiClient::new(config).unwrap()), sink, notifier)
}

#[tokio::test]
async fn submit_without_selection_reports_no_file() {
    let server = MockServer::start().await;
    let session = session_for(&server, RecordingSink::new(), RecordingNotifier::new());
    assert_eq!(session.submit().await, Err(JobError::NoFileSelected));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn full_run_then_download_latest() {
    let server = service_with_artifact().await;
    let sink = RecordingSink::new();
    let notifier = RecordingNotifier::new();
    let mut session = session_for(&server, sink.clone(), notifier.clone());

    session.select(pdf_candidate("deck.pdf")).unwrap();
    let result = session.submit().await.unwrap();
    assert_eq!(result.details.total_removed, 7);

    let saved = session.download_latest().await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "out.pdf");
    assert_eq!(sink.saves(), vec![(PDF_BYTES.to_vec(), "out.pdf".to_string())]);

    let levels: Vec<Level> = notifier.events().into_iter().map(|(level, _)| level).collect();
    assert_eq!(levels, vec![Level::Success, Level::Success, Level::Success]);
}

#[tokio::test]
async fn new_selection_clears_a_finished_result() {
    let server = service_with_artifact().await;
    let mut session = session_for(&server, RecordingSink::new(), RecordingNotifier::new());

    session.select(pdf_candidate("first.pdf")).unwrap();
    session.submit().await.unwrap();
    assert!(matches!(session.state(), JobState::Succeeded(_)));

    // A rejected candidate leaves the result alone.
    session
        .select(Candidate::new("slides.key", "application/x-iwork-keynote", Vec::new()))
        .unwrap_err();
    assert!(matches!(session.state(), JobState::Succeeded(_)));

    session.select(pdf_candidate("second.pdf")).unwrap();
    assert_eq!(session.state(), JobState::Idle);
    assert_eq!(*session.controller().progress_updates().borrow(), 0.0);
    assert!(matches!(
        session.download_latest().await,
        Err(RetrievalError::NoArtifact)
    ));
}

#[tokio::test]
async fn failed_download_does_not_touch_job_state() {
    let server = service_with_artifact().await;
    Mock::given(method("GET"))
        .and(path("/files/broken.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let sink = RecordingSink::new();
    let mut session = session_for(&server, sink.clone(), RecordingNotifier::new());

    session.select(pdf_candidate("deck.pdf")).unwrap();
    session.submit().await.unwrap();
    let before = session.state();

    assert!(session.download("/files/broken.pdf", "broken.pdf").await.is_err());
    assert_eq!(session.state(), before);

    session.download_latest().await.unwrap();
    session.download_latest().await.unwrap();
    assert_eq!(session.state(), before);
    assert_eq!(sink.saves().len(), 2);
}

#[tokio::test]
async fn nothing_to_download_before_any_job() {
    let server = MockServer::start().await;
    let sink = RecordingSink::new();
    let notifier = RecordingNotifier::new();
    let session = session_for(&server, sink.clone(), notifier.clone());
    assert!(matches!(
        session.download_latest().await,
        Err(RetrievalError::NoArtifact)
    ));
    assert_eq!(
        notifier.take(),
        vec![(Level::Error, RetrievalError::NoArtifact.to_string())]
    );
    assert!(sink.saves().is_empty());
    assert_eq!(session.state(), JobState::Idle);
}
