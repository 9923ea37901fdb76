//! Metrics for the speech relay
//!
//! A small pluggable layer: handlers record through [`Metrics`], which forwards
//! to a [`MetricsExporter`] chosen at startup (Prometheus or no-op). Recording
//! never fails a request; exporter errors are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;

use crate::error::ErrorKind;
use crate::metrics::error::MetricsError;
use crate::metrics::null::NullExporter;
use crate::metrics::prometheus::PrometheusExporter;

/// Metrics exporter trait for pluggable monitoring systems
#[async_trait]
pub trait MetricsExporter: Send + Sync {
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError>;

    async fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError>;

    /// Export metrics in the format expected by the monitoring system
    async fn export(&self) -> Result<Vec<u8>, MetricsError>;

    /// Content type of the exported payload
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}

#[derive(Clone)]
pub struct Metrics {
    exporter: Arc<dyn MetricsExporter>,
}

impl Metrics {
    pub fn new(exporter: Arc<dyn MetricsExporter>) -> Self {
        Self { exporter }
    }

    pub async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        self.exporter.export().await
    }

    pub fn content_type(&self) -> &'static str {
        self.exporter.content_type()
    }

    async fn increment_internal(&self, name: &str, labels: &[(&str, &str)]) {
        if let Err(e) = self.exporter.increment(name, labels).await {
            warn!("Failed to increment metric {}: {}", name, e);
        }
    }

    async fn observe_histogram_internal(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        if let Err(e) = self.exporter.observe_histogram(name, value, labels).await {
            warn!("Failed to observe metric {}: {}", name, e);
        }
    }

    pub async fn record_http_request(&self, endpoint: &str, method: &str, status: &str, duration: f64) {
        let labels = [("endpoint", endpoint), ("method", method), ("status", status)];
        self.observe_histogram_internal("http_request_duration_seconds", duration, &labels)
            .await;
        self.increment_internal("http_requests_total", &labels).await;
    }

    /// Records one transcription outcome; `None` means success
    pub async fn record_transcription(&self, failure: Option<ErrorKind>, duration: f64) {
        let outcome = failure.map(|kind| kind.as_str()).unwrap_or("success");
        self.increment_internal("transcriptions_total", &[("outcome", outcome)])
            .await;
        self.observe_histogram_internal(
            "transcription_duration_seconds",
            duration,
            &[("outcome", outcome)],
        )
        .await;
    }

    pub async fn record_upload_size(&self, size_bytes: usize) {
        self.observe_histogram_internal("upload_size_bytes", size_bytes as f64, &[])
            .await;
    }
}

/// Create an exporter by backend name. Unknown names fall back to the no-op exporter.
pub fn create_metrics_exporter(exporter_type: &str) -> Arc<dyn MetricsExporter> {
    match exporter_type.to_lowercase().as_str() {
        "prometheus" => Arc::new(PrometheusExporter::new()),
        "none" | "disabled" => Arc::new(NullExporter),
        other => {
            warn!("Unknown metrics backend '{}', metrics disabled", other);
            Arc::new(NullExporter)
        }
    }
}
