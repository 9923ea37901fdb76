// Speech relay data models
//
// Request and response types shared by the HTTP handlers.

use serde::{Deserialize, Serialize};

use crate::file_utils::TransientUpload;

/// Successful transcription response
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct TranscriptResponse {
    /// First alternative of every segment, joined with newlines
    pub transcript: String,
}

/// Error response for API
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query string of `POST /transcribe`
#[derive(Deserialize, Debug, Default)]
pub struct TranscribeQuery {
    pub lang: Option<String>,
}

impl TranscribeQuery {
    /// The requested language, or `default` when `lang` is absent or empty
    pub fn language_or(&self, default: &str) -> String {
        match self.lang.as_deref() {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => default.to_string(),
        }
    }
}

/// Output of upload intake: the stored audio, its size in bytes and declared content type
#[derive(Debug)]
pub struct UploadedAudio {
    pub upload: TransientUpload,
    pub size: usize,
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_defaults_when_absent_or_empty() {
        assert_eq!(TranscribeQuery { lang: None }.language_or("en-US"), "en-US");
        assert_eq!(
            TranscribeQuery {
                lang: Some(String::new())
            }
            .language_or("en-US"),
            "en-US"
        );
        assert_eq!(
            TranscribeQuery {
                lang: Some("fr-FR".to_string())
            }
            .language_or("en-US"),
            "fr-FR"
        );
    }
}
