// Speech relay metrics for monitoring and observability
//
// This module contains the metrics for the speech relay.
// It provides functionality to track and report request and transcription metrics.

pub mod error;
#[allow(clippy::module_inception)]
pub mod metrics;
pub mod null;
pub mod prometheus;


pub use self::error::MetricsError;
pub use self::metrics::{create_metrics_exporter, Metrics, MetricsExporter};
