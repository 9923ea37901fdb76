// Transcription relay
//
// Turns a stored upload into a transcript: base64-encode the file, send one
// recognize request under an optional deadline, join the returned segments,
// and remove the transient file whatever the outcome.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use log::{debug, info};
use tokio::io::AsyncReadExt;

use crate::error::HandlerError;
use crate::file_utils::TransientUpload;
use crate::recognition::{RecognitionError, RecognizeRequest, RecognizeResponse, SpeechRecognizer};

/// Read size used while streaming the upload into the encoder
const READ_CHUNK_SIZE: usize = 64 * 1024;

pub struct TranscriptionRelay {
    recognizer: Arc<dyn SpeechRecognizer>,
    timeout: Option<Duration>,
}

impl TranscriptionRelay {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, timeout: Option<Duration>) -> Self {
        Self {
            recognizer,
            timeout,
        }
    }

    /// Transcribes `upload` in `language`. The upload is removed before returning,
    /// on success and on every failure.
    pub async fn transcribe(
        &self,
        upload: TransientUpload,
        language: &str,
    ) -> Result<String, HandlerError> {
        let result = self.transcribe_file(upload.path(), language).await;
        upload.remove();
        result
    }

    async fn transcribe_file(&self, path: &Path, language: &str) -> Result<String, HandlerError> {
        let content = encode_file_base64(path)
            .await
            .map_err(HandlerError::AudioRead)?;

        let request = RecognizeRequest::linear16(content, language);
        let response = self.recognize(&request).await?;
        let transcript = response.joined_transcript()?;

        info!(
            "Transcribed {} segment(s) ({} chars, language={})",
            response.results.len(),
            transcript.len(),
            language
        );
        Ok(transcript)
    }

    async fn recognize(
        &self,
        request: &RecognizeRequest,
    ) -> Result<RecognizeResponse, RecognitionError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.recognizer.recognize(request))
                .await
                .map_err(|_| RecognitionError::Timeout(limit))?,
            None => self.recognizer.recognize(request).await,
        }
    }
}

/// Reads `path` in chunks straight into a base64 encoder so the raw bytes are
/// never fully buffered next to their encoding
pub async fn encode_file_base64(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut encoder = EncoderStringWriter::new(&STANDARD);
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    let mut total = 0usize;

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        encoder.write_all(&buffer[..read])?;
        total += read;
    }

    debug!("Encoded {} bytes from {}", total, path.display());
    Ok(encoder.into_inner())
}
