/// Prometheus metrics exporter implementation
///
/// Metrics are created lazily on first use and registered in a private registry.
/// The label names seen on first use become the metric's label set.
use crate::metrics::error::{validation, MetricsError};
use crate::metrics::metrics::MetricsExporter;
use async_trait::async_trait;
use log::debug;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tokio::sync::Mutex;

pub struct PrometheusExporter {
    registry: Registry,
    counters: Mutex<HashMap<String, CounterVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// Get appropriate histogram buckets based on metric name
    fn histogram_buckets(name: &str) -> Vec<f64> {
        if name.contains("size") || name.contains("bytes") {
            // 16KB to 16MB
            vec![
                16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0, 10485760.0, 16777216.0,
            ]
        } else {
            // Durations: recognize calls range from sub-second to a minute
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
        }
    }

    fn help_text(name: &str, metric_type: &str) -> String {
        format!("{} ({})", name.replace('_', " "), metric_type)
    }

    fn label_map<'a>(labels: &'a [(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        labels.iter().copied().collect()
    }

    async fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Result<CounterVec, MetricsError> {
        let mut counters = self.counters.lock().await;
        if let Some(counter) = counters.get(name) {
            return Ok(counter.clone());
        }

        let label_names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let counter = CounterVec::new(Opts::new(name, Self::help_text(name, "counter")), &label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        self.registry
            .register(Box::new(counter.clone()))
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;

        debug!("Registered counter {}", name);
        counters.insert(name.to_string(), counter.clone());
        Ok(counter)
    }

    async fn histogram(
        &self,
        name: &str,
        labels: &[(&str, &str)],
    ) -> Result<HistogramVec, MetricsError> {
        let mut histograms = self.histograms.lock().await;
        if let Some(histogram) = histograms.get(name) {
            return Ok(histogram.clone());
        }

        let label_names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let opts = HistogramOpts::new(name, Self::help_text(name, "histogram"))
            .buckets(Self::histogram_buckets(name));
        let histogram = HistogramVec::new(opts, &label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        self.registry
            .register(Box::new(histogram.clone()))
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;

        debug!("Registered histogram {}", name);
        histograms.insert(name.to_string(), histogram.clone());
        Ok(histogram)
    }
}

#[async_trait]
impl MetricsExporter for PrometheusExporter {
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        validation::validate_metric_name(name)?;
        validation::validate_labels(labels)?;

        let counter = self.counter(name, labels).await?;
        counter
            .get_metric_with(&Self::label_map(labels))
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .inc();
        Ok(())
    }

    async fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError> {
        validation::validate_metric_name(name)?;
        validation::validate_labels(labels)?;
        validation::validate_value(value)?;

        let histogram = self.histogram(name, labels).await?;
        histogram
            .get_metric_with(&Self::label_map(labels))
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .observe(value);
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::export_failed(e.to_string()))?;
        Ok(buffer)
    }

    fn content_type(&self) -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}
