// API route handlers for the speech relay
//
// This module contains the HTTP endpoints: the liveness check, the
// transcription endpoint and the metrics export.

use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, ResponseError};
use log::{error, info, warn};

use crate::config::HandlerConfig;
use crate::error::{ErrorKind, HandlerError};
use crate::handlers::form::extract_upload;
use crate::metrics::Metrics;
use crate::models::{ErrorResponse, TranscribeQuery, TranscriptResponse};
use crate::relay::TranscriptionRelay;

/// Body of the liveness check
pub const LIVENESS_MESSAGE: &str = "Speech relay is running";

/// Liveness check. Never touches the Recognition Service.
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(LIVENESS_MESSAGE)
}

/// Handler for transcription requests
///
/// Stores the `audio` field, relays it to the Recognition Service in the
/// language named by `lang` (default from configuration) and answers with
/// the joined transcript.
#[post("/transcribe")]
pub async fn transcribe(
    query: web::Query<TranscribeQuery>,
    form: Multipart,
    relay: web::Data<TranscriptionRelay>,
    config: web::Data<HandlerConfig>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, HandlerError> {
    let start_time = Instant::now();
    let language = query.language_or(&config.default_language);

    let result = transcribe_upload(form, &language, &relay, &config, &metrics).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    metrics
        .record_http_request(
            "/transcribe",
            "POST",
            status.as_str(),
            start_time.elapsed().as_secs_f64(),
        )
        .await;

    let transcript = result?;
    Ok(HttpResponse::Ok().json(TranscriptResponse { transcript }))
}

async fn transcribe_upload(
    form: Multipart,
    language: &str,
    relay: &TranscriptionRelay,
    config: &HandlerConfig,
    metrics: &Metrics,
) -> Result<String, HandlerError> {
    let audio = extract_upload(form, config).await.map_err(|e| {
        match e.kind() {
            ErrorKind::BadUpload => warn!("Rejected upload: {}", e),
            kind => error!("Upload failed (kind={}): {}", kind, e),
        }
        e
    })?;
    metrics.record_upload_size(audio.size).await;

    info!(
        "Transcribing upload {} ({} bytes, content type {}, language {})",
        audio.upload.id(),
        audio.size,
        audio.content_type.as_deref().unwrap_or("unspecified"),
        language
    );

    let started = Instant::now();
    let outcome = relay.transcribe(audio.upload, language).await;
    let elapsed = started.elapsed().as_secs_f64();

    match &outcome {
        Ok(_) => metrics.record_transcription(None, elapsed).await,
        Err(e) => {
            error!("Transcription failed (kind={}): {}", e.kind(), e);
            metrics.record_transcription(Some(e.kind()), elapsed).await;
        }
    }
    outcome
}

/// Metrics export in the configured backend's format
#[get("/metrics")]
pub async fn metrics_endpoint(metrics: web::Data<Metrics>) -> HttpResponse {
    match metrics.export().await {
        Ok(data) => HttpResponse::Ok()
            .content_type(metrics.content_type())
            .body(data),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Failed to export metrics: {}", e),
            })
        }
    }
}
