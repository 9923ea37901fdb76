//! Google Cloud Speech-to-Text REST client.
//!
//! Sends one `speech:recognize` request per transcription and maps transport
//! failures and HTTP statuses onto [`RecognitionError`].

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::{Credentials, RecognitionError, RecognizeRequest, RecognizeResponse, SpeechRecognizer};
use crate::config::ServiceConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GoogleSpeechClient {
    client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl GoogleSpeechClient {
    pub fn new(config: &ServiceConfig, credentials: Credentials) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, &config.endpoint, credentials))
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str, credentials: Credentials) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            credentials,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn map_send_error(e: reqwest::Error) -> RecognitionError {
    if e.is_connect() {
        RecognitionError::Unavailable(format!("connection failed: {}", e))
    } else if e.is_timeout() {
        RecognitionError::Unavailable(format!("request timed out: {}", e))
    } else {
        RecognitionError::Unavailable(format!("network error: {}", e))
    }
}

fn map_status(status: reqwest::StatusCode, body: String) -> RecognitionError {
    let code = status.as_u16();
    if status.is_server_error() || code == 408 || code == 429 {
        RecognitionError::Unavailable(format!("status {}: {}", status, body))
    } else {
        RecognitionError::Rejected {
            status: code,
            message: body,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechClient {
    async fn recognize(
        &self,
        request: &RecognizeRequest,
    ) -> Result<RecognizeResponse, RecognitionError> {
        debug!(
            "Recognize call: POST {} (language={}, encoding={:?}, sample_rate={}, {} base64 bytes)",
            self.endpoint,
            request.config.language_code,
            request.config.encoding,
            request.config.sample_rate_hertz,
            request.audio.content.len()
        );

        let builder = self.client.post(&self.endpoint).json(request);
        let builder = self.credentials.authorize(&self.client, builder).await?;

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status, body));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        debug!("Recognize call returned {} segment(s)", parsed.results.len());
        Ok(parsed)
    }
}
