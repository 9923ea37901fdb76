//! Error types for the metrics system

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MetricsError {
    /// Invalid metric name (e.g., empty, invalid characters)
    #[error("Invalid metric name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },

    /// Metric registration failed (e.g., same name registered with another type)
    #[error("Failed to register metric '{name}': {reason}")]
    RegistrationFailed { name: String, reason: String },

    #[error("Failed to export metrics: {reason}")]
    ExportFailed { reason: String },
}

impl MetricsError {
    pub fn invalid_name<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_label<L: Into<String>, R: Into<String>>(label: L, reason: R) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value<R: Into<String>>(value: f64, reason: R) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn registration_failed<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::RegistrationFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn export_failed<R: Into<String>>(reason: R) -> Self {
        Self::ExportFailed {
            reason: reason.into(),
        }
    }
}

/// Validation functions for metric names, labels and values
pub mod validation {
    use super::MetricsError;

    /// Prometheus reserved label names that cannot be used
    const RESERVED_LABELS: &[&str] = &["__name__", "le", "quantile"];

    /// Metric names must start with a letter or underscore and contain only
    /// ASCII letters, digits, underscores and colons
    pub fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
        let mut chars = name.chars();
        match chars.next() {
            None => return Err(MetricsError::invalid_name(name, "Metric name cannot be empty")),
            Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
                return Err(MetricsError::invalid_name(
                    name,
                    "Metric name must start with a letter or underscore",
                ))
            }
            _ => {}
        }

        if let Some(ch) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == ':')) {
            return Err(MetricsError::invalid_name(
                name,
                format!("Invalid character '{}'", ch),
            ));
        }

        Ok(())
    }

    pub fn validate_label_key(key: &str) -> Result<(), MetricsError> {
        if key.is_empty() {
            return Err(MetricsError::invalid_label(key, "Label name cannot be empty"));
        }
        if key.starts_with("__") || RESERVED_LABELS.contains(&key) {
            return Err(MetricsError::invalid_label(key, "Label name is reserved"));
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            || key.starts_with(|c: char| c.is_ascii_digit())
        {
            return Err(MetricsError::invalid_label(
                key,
                "Label name must match [a-zA-Z_][a-zA-Z0-9_]*",
            ));
        }
        Ok(())
    }

    pub fn validate_labels(labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        for (key, _) in labels {
            validate_label_key(key)?;
        }
        Ok(())
    }

    pub fn validate_value(value: f64) -> Result<(), MetricsError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(MetricsError::invalid_value(value, "Value must be finite"))
        }
    }
}
