// Speech relay library
//
// This crate provides an HTTP relay that forwards uploaded audio to the
// Google Speech-to-Text `speech:recognize` API and returns the transcript.

pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod error;
pub mod file_utils;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod recognition;
pub mod relay;

// Re-export common types for easier access
pub use config::{HandlerConfig, MetricsConfig, ServerConfig, ServiceConfig};
pub use error::{ErrorKind, HandlerError};
pub use handlers::{configure, index, metrics_endpoint, transcribe};
pub use metrics::{create_metrics_exporter, Metrics};
pub use models::{ErrorResponse, TranscriptResponse};
pub use recognition::{Credentials, GoogleSpeechClient, SpeechRecognizer};
pub use relay::TranscriptionRelay;
