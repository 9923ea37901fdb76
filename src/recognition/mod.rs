// Recognition Service client
//
// Wire types for the synchronous `speech:recognize` call, the `SpeechRecognizer`
// seam the relay talks to, and the errors a recognizer can produce.

pub mod credentials;
pub mod google;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

pub use self::credentials::{Credentials, CredentialsError};
pub use self::google::GoogleSpeechClient;

/// Sample rate every upload is declared at
pub const SAMPLE_RATE_HERTZ: u32 = 16000;

/// Transcribes a single combined request
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, request: &RecognizeRequest)
        -> Result<RecognizeResponse, RecognitionError>;
}

/// Errors raised while talking to the Recognition Service
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// Network failure or a transient status (5xx, 408, 429)
    #[error("Recognition service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request
    #[error("Recognition service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The call did not complete before the deadline
    #[error("Recognition service did not answer within {0:?}")]
    Timeout(Duration),

    /// The response body did not have the expected shape
    #[error("Malformed recognition response: {0}")]
    MalformedResponse(String),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialsError),
}

impl RecognitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecognitionError::Unavailable(_) | RecognitionError::Timeout(_) => {
                ErrorKind::ServiceUnavailable
            }
            RecognitionError::Rejected { .. } | RecognitionError::Credentials(_) => {
                ErrorKind::ServiceRejected
            }
            RecognitionError::MalformedResponse(_) => ErrorKind::InternalIo,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RecognitionError::Timeout(_))
    }
}

/// Audio encodings understood by the service. Only linear PCM is sent.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    #[serde(rename = "LINEAR16")]
    Linear16,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecognitionAudio {
    /// Base64 encoded audio bytes
    pub content: String,
}

/// Body of one `speech:recognize` call
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecognizeRequest {
    pub audio: RecognitionAudio,
    pub config: AudioConfig,
}

impl RecognizeRequest {
    /// Builds the fixed 16 kHz LINEAR16 request. The language code is passed through verbatim.
    pub fn linear16<L: Into<String>>(content: String, language_code: L) -> Self {
        Self {
            audio: RecognitionAudio { content },
            config: AudioConfig {
                encoding: AudioEncoding::Linear16,
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code: language_code.into(),
            },
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RecognizeResponse {
    /// Absent when the service heard no speech
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SpeechRecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SpeechRecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl RecognizeResponse {
    /// Joins the first alternative of every segment with newlines, in service order.
    ///
    /// A segment without any alternative makes the whole response malformed;
    /// partial transcripts are never returned.
    pub fn joined_transcript(&self) -> Result<String, RecognitionError> {
        let mut segments = Vec::with_capacity(self.results.len());
        for (index, result) in self.results.iter().enumerate() {
            let first = result.alternatives.first().ok_or_else(|| {
                RecognitionError::MalformedResponse(format!(
                    "result segment {} has no alternatives",
                    index
                ))
            })?;
            segments.push(first.transcript.as_str());
        }
        Ok(segments.join("\n"))
    }
}
