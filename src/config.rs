// Speech relay configuration
//
// This module contains configuration structures and constants for the speech relay.
// Values come from environment variables, optionally seeded by the config file loader.

use std::env;
use std::time::Duration;

/// Default values for configuration
pub mod defaults {
    // Server binding
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 5000;

    // Client disconnect timeout and keep-alive in seconds
    pub const SERVER_TIMEOUT_SECONDS: u64 = 120;
    pub const SERVER_KEEPALIVE_SECONDS: u64 = 75;

    // Number of HTTP workers (0 = one per CPU core)
    pub const HTTP_WORKERS: usize = 0;

    // Directory holding transient uploads
    pub const UPLOAD_DIR: &str = "uploads";

    // 10MB, the inline audio limit of the synchronous recognize call
    pub const MAX_FILE_SIZE: usize = 10_485_760;

    // Language used when the `lang` query parameter is absent
    pub const LANGUAGE: &str = "en-US";

    // Google credential file (service account JSON or API key)
    pub const CREDENTIALS_FILE: &str = "google-credentials.json";

    // Synchronous recognize endpoint
    pub const RECOGNITION_ENDPOINT: &str = "https://speech.googleapis.com/v1/speech:recognize";

    // Deadline for one recognize call (0 = no deadline)
    pub const RECOGNITION_TIMEOUT_SECONDS: u64 = 60;

    pub const ENABLE_CORS: bool = true;

    // Valid metrics backends
    pub const METRICS_BACKENDS: [&str; 2] = ["prometheus", "none"];
    pub const METRICS_BACKEND: &str = "none";
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration for the HTTP server itself
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub keep_alive: Duration,
    pub workers: usize,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("SPEECH_RELAY_HOST").unwrap_or_else(|_| String::from(defaults::HOST)),
            port: env_or("SPEECH_RELAY_PORT", defaults::PORT),
            timeout: Duration::from_secs(env_or(
                "SPEECH_RELAY_TIMEOUT",
                defaults::SERVER_TIMEOUT_SECONDS,
            )),
            keep_alive: Duration::from_secs(env_or(
                "SPEECH_RELAY_KEEPALIVE",
                defaults::SERVER_KEEPALIVE_SECONDS,
            )),
            workers: env_or("HTTP_WORKER_NUMBER", defaults::HTTP_WORKERS),
            enable_cors: env_or("ENABLE_CORS", defaults::ENABLE_CORS),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the upload and transcription handlers
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Directory to store transient uploads
    pub upload_dir: String,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
    /// Language code used when the request does not name one
    pub default_language: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            upload_dir: env::var("SPEECH_RELAY_UPLOAD_DIR")
                .unwrap_or_else(|_| String::from(defaults::UPLOAD_DIR)),
            max_file_size: env_or("MAX_FILE_SIZE", defaults::MAX_FILE_SIZE),
            default_language: env::var("DEFAULT_LANGUAGE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| String::from(defaults::LANGUAGE)),
        }
    }
}

impl HandlerConfig {
    /// Ensures the upload directory exists
    pub fn ensure_upload_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)
    }
}

/// Configuration for the outbound Recognition Service client
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub credentials_file: String,
    /// `None` when the deadline is disabled
    pub timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let timeout_secs = env_or(
            "RECOGNITION_TIMEOUT_SECONDS",
            defaults::RECOGNITION_TIMEOUT_SECONDS,
        );
        Self {
            endpoint: env::var("RECOGNITION_ENDPOINT")
                .unwrap_or_else(|_| String::from(defaults::RECOGNITION_ENDPOINT)),
            credentials_file: env::var("GOOGLE_CREDENTIALS_FILE")
                .unwrap_or_else(|_| String::from(defaults::CREDENTIALS_FILE)),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}

/// Configuration for metrics collection and export
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Type of metrics exporter ("prometheus", "none")
    pub exporter_type: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            exporter_type: env::var("SPEECH_RELAY_METRICS_BACKEND")
                .unwrap_or_else(|_| String::from(defaults::METRICS_BACKEND)),
        }
    }
}
