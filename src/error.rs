// Error handling for the speech relay
//
// This module defines the tagged error returned by the HTTP handlers.
// Upload problems become 4xx responses with a descriptive message; every failure
// on the transcription path becomes a 500 with a fixed, non-specific message.

use std::fmt;
use std::io;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::recognition::RecognitionError;

/// Message returned to callers for any transcription failure
pub const TRANSCRIPTION_FAILED_MESSAGE: &str = "Failed to transcribe audio.";

/// Message returned for a multipart body that cannot be parsed
pub const MALFORMED_FORM_MESSAGE: &str = "Malformed multipart/form-data request body.";

/// Message returned when the upload cannot be stored locally
pub const UPLOAD_STORAGE_FAILED_MESSAGE: &str = "Failed to store uploaded audio.";

/// Coarse error classification used for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadUpload,
    ServiceUnavailable,
    ServiceRejected,
    InternalIo,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadUpload => "bad_upload",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::ServiceRejected => "service_rejected",
            ErrorKind::InternalIo => "internal_io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the relay handlers
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    Form(String),

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("No audio file provided in the request")]
    NoAudioFile,

    #[error("Only one audio file may be uploaded per request")]
    DuplicateAudioField,

    #[error("Uploaded audio file is empty")]
    EmptyUpload,

    #[error("File too large: exceeds limit of {0} bytes")]
    FileTooLarge(usize),

    #[error("Unsupported media type: {0}. Expected audio/* or application/octet-stream")]
    UnsupportedMediaType(String),

    /// Error when creating or writing the transient file
    #[error("Upload storage error: {0}")]
    UploadStorage(#[source] io::Error),

    /// Error when reading the transient file back for encoding
    #[error("Failed to read audio file: {0}")]
    AudioRead(#[source] io::Error),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

impl HandlerError {
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::Form(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Form(_)
            | HandlerError::InvalidQuery(_)
            | HandlerError::NoAudioFile
            | HandlerError::DuplicateAudioField
            | HandlerError::EmptyUpload
            | HandlerError::FileTooLarge(_)
            | HandlerError::UnsupportedMediaType(_) => ErrorKind::BadUpload,
            HandlerError::UploadStorage(_) | HandlerError::AudioRead(_) => ErrorKind::InternalIo,
            HandlerError::Recognition(e) => e.kind(),
        }
    }

    /// Message exposed to the caller
    pub fn public_message(&self) -> String {
        match self {
            HandlerError::Form(_) => MALFORMED_FORM_MESSAGE.to_string(),
            HandlerError::UploadStorage(_) => UPLOAD_STORAGE_FAILED_MESSAGE.to_string(),
            HandlerError::AudioRead(_) | HandlerError::Recognition(_) => {
                TRANSCRIPTION_FAILED_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Form(_)
            | HandlerError::InvalidQuery(_)
            | HandlerError::NoAudioFile
            | HandlerError::DuplicateAudioField
            | HandlerError::EmptyUpload => StatusCode::BAD_REQUEST,
            HandlerError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HandlerError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HandlerError::UploadStorage(_)
            | HandlerError::AudioRead(_)
            | HandlerError::Recognition(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.public_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use std::time::Duration;

    async fn body_of(err: HandlerError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn recognition_failures_share_one_generic_response() {
        let errors = vec![
            HandlerError::from(RecognitionError::Unavailable("refused".into())),
            HandlerError::from(RecognitionError::Rejected {
                status: 403,
                message: "quota".into(),
            }),
            HandlerError::from(RecognitionError::Timeout(Duration::from_secs(5))),
            HandlerError::from(RecognitionError::MalformedResponse("shape".into())),
            HandlerError::AudioRead(io::Error::new(io::ErrorKind::NotFound, "gone")),
        ];

        for err in errors {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, serde_json::json!({ "error": "Failed to transcribe audio." }));
        }
    }

    #[actix_web::test]
    async fn upload_errors_are_client_errors() {
        let (status, body) = body_of(HandlerError::NoAudioFile).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No audio file provided in the request");

        let (status, body) =
            body_of(HandlerError::form_error("ContentTypeIncompatible")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Malformed multipart/form-data request body.");

        let (status, body) =
            body_of(HandlerError::InvalidQuery("duplicate field `lang`".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid query string: duplicate field `lang`");

        let (status, _) = body_of(HandlerError::FileTooLarge(1024)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (status, _) = body_of(HandlerError::UnsupportedMediaType("text/plain".into())).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn kinds_follow_the_error_source() {
        assert_eq!(HandlerError::EmptyUpload.kind(), ErrorKind::BadUpload);
        assert_eq!(
            HandlerError::UploadStorage(io::Error::other("disk full")).kind(),
            ErrorKind::InternalIo
        );
        assert_eq!(
            HandlerError::from(RecognitionError::Timeout(Duration::from_secs(1))).kind(),
            ErrorKind::ServiceUnavailable
        );
    }
}
