// HTTP-level tests for the relay endpoints

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use crate::config::HandlerConfig;
use crate::handlers::configure;
use crate::metrics::{create_metrics_exporter, Metrics};
use crate::recognition::{
    RecognitionError, RecognizeRequest, RecognizeResponse, SpeechRecognitionAlternative,
    SpeechRecognitionResult, SpeechRecognizer,
};
use crate::relay::TranscriptionRelay;

const BOUNDARY: &str = "speech-relay-test-boundary";

struct StubRecognizer {
    outcome: fn() -> Result<RecognizeResponse, RecognitionError>,
    seen: Mutex<Vec<RecognizeRequest>>,
}

impl StubRecognizer {
    fn new(outcome: fn() -> Result<RecognizeResponse, RecognitionError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<RecognizeRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechRecognizer for StubRecognizer {
    async fn recognize(
        &self,
        request: &RecognizeRequest,
    ) -> Result<RecognizeResponse, RecognitionError> {
        self.seen.lock().unwrap().push(request.clone());
        (self.outcome)()
    }
}

fn segments(transcripts: &[&str]) -> RecognizeResponse {
    RecognizeResponse {
        results: transcripts
            .iter()
            .map(|t| SpeechRecognitionResult {
                alternatives: vec![
                    SpeechRecognitionAlternative {
                        transcript: t.to_string(),
                        confidence: Some(0.9),
                    },
                    SpeechRecognitionAlternative {
                        transcript: "ignored".to_string(),
                        confidence: Some(0.1),
                    },
                ],
            })
            .collect(),
    }
}

fn hello_world() -> Result<RecognizeResponse, RecognitionError> {
    Ok(segments(&["hello", "world"]))
}

fn silence() -> Result<RecognizeResponse, RecognitionError> {
    Ok(RecognizeResponse::default())
}

fn service_down() -> Result<RecognizeResponse, RecognitionError> {
    Err(RecognitionError::Rejected {
        status: 403,
        message: "API key not valid".to_string(),
    })
}

struct Part<'a> {
    name: &'a str,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn audio_part(data: &[u8]) -> Part<'_> {
    Part {
        name: "audio",
        content_type: Some("audio/wav"),
        data,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.wav\"\r\n",
                part.name, part.name
            )
            .as_bytes(),
        );
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn transcribe_request(uri: &str, parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn handler_config(upload_dir: &Path, max_file_size: usize) -> HandlerConfig {
    HandlerConfig {
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_file_size,
        default_language: "en-US".to_string(),
    }
}

fn files_left(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

macro_rules! relay_app {
    ($recognizer:expr, $config:expr, $metrics:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(TranscriptionRelay::new(
                    $recognizer.clone(),
                    Some(Duration::from_secs(5)),
                )))
                .app_data(web::Data::new($config))
                .app_data(web::Data::new($metrics.clone()))
                .configure(configure),
        )
        .await
    };
}

#[actix_web::test]
async fn transcribes_upload_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let audio = [0u8, 1, 2, 3, 4, 5, 6, 7];
    let req = transcribe_request("/transcribe", &[audio_part(&audio)]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "transcript": "hello\nworld" }));

    let requests = recognizer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].audio.content, STANDARD.encode(audio));
    assert_eq!(requests[0].config.language_code, "en-US");
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn language_is_passed_through_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req =
        transcribe_request("/transcribe?lang=fr-FR", &[audio_part(b"RIFF")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = transcribe_request("/transcribe?lang=", &[audio_part(b"RIFF")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let languages: Vec<String> = recognizer
        .requests()
        .into_iter()
        .map(|r| r.config.language_code)
        .collect();
    assert_eq!(languages, vec!["fr-FR", "en-US"]);
}

#[actix_web::test]
async fn missing_audio_field_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let note = Part {
        name: "note",
        content_type: Some("text/plain"),
        data: b"not audio",
    };
    let req = transcribe_request("/transcribe", &[note]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No audio file provided in the request");
    assert!(recognizer.requests().is_empty());
}

#[actix_web::test]
async fn repeated_lang_parameter_gets_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = transcribe_request("/transcribe?lang=fr-FR&lang=de-DE", &[audio_part(b"RIFF")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid query string: duplicate field `lang`");
    assert!(recognizer.requests().is_empty());
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn malformed_multipart_body_gets_a_fixed_message() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = test::TestRequest::post()
        .uri("/transcribe")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{}")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Malformed multipart/form-data request body." }));
    assert!(recognizer.requests().is_empty());
}

#[actix_web::test]
async fn unknown_fields_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let note = Part {
        name: "note",
        content_type: Some("text/plain"),
        data: b"meeting notes",
    };
    let req = transcribe_request("/transcribe", &[note, audio_part(b"RIFF")]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(recognizer.requests().len(), 1);
}

#[actix_web::test]
async fn service_failure_returns_generic_error_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(service_down);
    let metrics = Metrics::new(create_metrics_exporter("prometheus"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = transcribe_request("/transcribe", &[audio_part(b"RIFF")]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Failed to transcribe audio." }));
    assert_eq!(files_left(dir.path()), 0);

    let exported = String::from_utf8(metrics.export().await.unwrap()).unwrap();
    assert!(exported.contains("transcriptions_total{outcome=\"service_rejected\"} 1"));
}

#[actix_web::test]
async fn empty_result_is_an_empty_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(silence);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = transcribe_request("/transcribe", &[audio_part(b"RIFF")]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "transcript": "" }));
}

#[actix_web::test]
async fn oversized_upload_is_rejected_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 8), metrics);

    let req = transcribe_request("/transcribe", &[audio_part(&[7u8; 64])]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(recognizer.requests().is_empty());
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn non_audio_content_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let part = Part {
        name: "audio",
        content_type: Some("text/plain"),
        data: b"hello",
    };
    let req = transcribe_request("/transcribe", &[part]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn octet_stream_uploads_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let part = Part {
        name: "audio",
        content_type: Some("application/octet-stream"),
        data: b"RIFF",
    };
    let req = transcribe_request("/transcribe", &[part]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn duplicate_audio_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let parts = [audio_part(b"one"), audio_part(b"two")];
    let req = transcribe_request("/transcribe", &parts).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(recognizer.requests().is_empty());
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn empty_audio_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = transcribe_request("/transcribe", &[audio_part(b"")]).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(files_left(dir.path()), 0);
}

#[actix_web::test]
async fn liveness_check_does_not_touch_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(service_down);
    let metrics = Metrics::new(create_metrics_exporter("none"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(!body.is_empty());
    assert!(recognizer.requests().is_empty());
}

#[actix_web::test]
async fn metrics_endpoint_exports_request_counts() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = StubRecognizer::new(hello_world);
    let metrics = Metrics::new(create_metrics_exporter("prometheus"));
    let app = relay_app!(recognizer, handler_config(dir.path(), 1024), metrics);

    let req = transcribe_request("/transcribe", &[audio_part(b"RIFF")]).to_request();
    test::call_service(&app, req).await;

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(text.contains(
        "http_requests_total{endpoint=\"/transcribe\",method=\"POST\",status=\"200\"} 1"
    ));
    assert!(text.contains("transcriptions_total{outcome=\"success\"} 1"));
}
