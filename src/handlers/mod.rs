// Speech relay HTTP handlers
//
// This module contains the HTTP handlers for the speech relay.
// It provides the interface between HTTP requests and the transcription relay.

pub mod form;
pub mod routes;

#[cfg(test)]
mod tests;

use actix_web::error::QueryPayloadError;
use actix_web::{web, HttpRequest};
use log::warn;

use crate::error::HandlerError;

// Re-export handlers for easier access
pub use self::form::extract_upload;
pub use self::routes::{index, metrics_endpoint, transcribe};

/// Registers every relay endpoint
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .service(index)
        .service(transcribe)
        .service(metrics_endpoint);
}

/// Rejected query strings get the same JSON error body as handler errors
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let detail = match err {
        QueryPayloadError::Deserialize(e) => e.to_string(),
        other => other.to_string(),
    };
    let error = HandlerError::InvalidQuery(detail);
    warn!("Rejected request: {}", error);
    error.into()
}
