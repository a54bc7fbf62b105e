//! HTTP collaborator clients against a mock server

use ridecast_podcast::models::{AnalysisStatus, ArtifactKey, Discipline, FormattedScript};
use ridecast_podcast::services::{
    AnalysisSource, ArtifactStore, FetchError, GenerationError, HttpAnalysisSource,
    HttpArtifactStore, HttpSynthesisWorker, HttpTextGenerator, ProbeError, SubmissionRequest,
    SynthesisWorker, TextGenerator,
};
use ridecast_podcast::PipelineError;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn generator(server: &MockServer, token: Option<&str>) -> HttpTextGenerator {
    HttpTextGenerator::new(
        &format!("{}/generate", server.uri()),
        token.map(str::to_string),
        NonZeroU32::new(50).unwrap(),
        TIMEOUT,
    )
    .unwrap()
}

#[tokio::test]
async fn test_text_generator_sends_prompt_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"prompt": "Describe the ride"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "What a ride."})))
        .expect(1)
        .mount(&server)
        .await;

    let text = generator(&server, Some("secret"))
        .generate("Describe the ride")
        .await
        .unwrap();
    assert_eq!(text, "What a ride.");
}

#[tokio::test]
async fn test_text_generator_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "   "})))
        .mount(&server)
        .await;

    let client = generator(&server, None);
    assert_eq!(
        client.generate("x").await.unwrap_err(),
        GenerationError::ApiError(429, "slow down".to_string())
    );
    assert_eq!(client.generate("x").await.unwrap_err(), GenerationError::EmptyResponse);
}

#[tokio::test]
async fn test_synthesis_worker_accepts_and_rejects() {
    let server = MockServer::start().await;
    let key = ArtifactKey::new("u1", "a1").unwrap();
    let request = SubmissionRequest::new(&FormattedScript::new("Narrator: Hi.".to_string()), &key);

    Mock::given(method("POST"))
        .and(path("/podcasts"))
        .and(body_json(json!({"script": "Narrator: Hi.", "ownerId": "u1", "analysisId": "a1"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"success": true, "jobId": "j-7"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/podcasts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "quota exceeded"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/podcasts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let worker = HttpSynthesisWorker::new(&format!("{}/podcasts", server.uri()), None, TIMEOUT).unwrap();

    let ack = worker.submit(&request).await.unwrap();
    assert_eq!(ack.job_id.as_deref(), Some("j-7"));

    let err = worker.submit(&request).await.unwrap_err();
    assert_eq!(err.status, Some(200));
    assert_eq!(err.message, "quota exceeded");

    let err = worker.submit(&request).await.unwrap_err();
    assert_eq!(err.status, Some(503));
}

#[tokio::test]
async fn test_synthesis_worker_unreachable() {
    // Nothing listens on the discard port
    let worker = HttpSynthesisWorker::new("http://127.0.0.1:9/podcasts", None, TIMEOUT).unwrap();
    let key = ArtifactKey::new("u1", "a1").unwrap();
    let request = SubmissionRequest::new(&FormattedScript::new("Narrator: Hi.".to_string()), &key);

    let err = worker.submit(&request).await.unwrap_err();
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn test_artifact_store_probe_statuses() {
    let server = MockServer::start().await;
    for (folder, status) in [("ready", 200), ("missing", 404), ("private", 403), ("broken", 500)] {
        Mock::given(method("HEAD"))
            .and(path(format!("/{}/podcast.mp3", folder)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let store = HttpArtifactStore::new(TIMEOUT).unwrap();
    let url = |folder: &str| format!("{}/{}/podcast.mp3", server.uri(), folder);

    assert_eq!(store.probe(&url("ready")).await, Ok(true));
    assert_eq!(store.probe(&url("missing")).await, Ok(false));
    assert_eq!(store.probe(&url("private")).await, Ok(false));
    assert_eq!(
        store.probe(&url("broken")).await,
        Err(ProbeError::UnexpectedStatus(500))
    );
}

#[tokio::test]
async fn test_artifact_store_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u1_a1/podcast.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
        .mount(&server)
        .await;

    let store = HttpArtifactStore::new(TIMEOUT).unwrap();
    let bytes = store
        .fetch(&format!("{}/u1_a1/podcast.mp3", server.uri()))
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ID3audio");

    // Unmatched requests get 404 from the mock server
    assert_eq!(
        store
            .fetch(&format!("{}/u2_a2/podcast.mp3", server.uri()))
            .await
            .unwrap_err(),
        FetchError::Status(404)
    );
}

#[tokio::test]
async fn test_analysis_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analyses/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "u1",
            "status": "completed",
            "discipline": "jumping",
            "fileName": "Round 2.pdf",
            "riderName": "Sam",
            "totalScore": 4.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analyses/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source =
        HttpAnalysisSource::new(&format!("{}/analyses/", server.uri()), None, TIMEOUT).unwrap();

    let record = source.load("a1").await.unwrap();
    assert_eq!(record.owner_id, "u1");
    assert_eq!(record.analysis_id, "a1");
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.discipline, Discipline::ShowJumping);
    assert_eq!(record.document_name.as_deref(), Some("Round 2.pdf"));

    assert!(matches!(
        source.load("nope").await,
        Err(PipelineError::AnalysisNotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        source.load("broken").await,
        Err(PipelineError::AnalysisSource(_))
    ));
}

#[tokio::test]
async fn test_analysis_source_keeps_id_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analyses/a1%3Fx=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "u1",
            "status": "completed"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"userId": "u9"})))
        .expect(0)
        .mount(&server)
        .await;

    let source = HttpAnalysisSource::new(
        &format!("{}/analyses", server.uri()),
        Some("svc-token".to_string()),
        TIMEOUT,
    )
    .unwrap();

    for id in ["../admin/secret", "..", "a1\\..\\admin"] {
        assert!(
            matches!(source.load(id).await, Err(PipelineError::MissingIdentity(_))),
            "accepted {:?}",
            id
        );
    }

    let record = source.load("a1?x=1").await.unwrap();
    assert_eq!(record.analysis_id, "a1?x=1");
}
