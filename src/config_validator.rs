// Configuration validation module for the speech relay
//
// Every configuration parameter is declared once in `CONFIG_PARAMS` with its type,
// default and severity. Startup validates the effective values against that
// registry and refuses to run on critical or standard errors.

use std::env;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use log::{error, info, warn};

use crate::config::defaults;

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    UnsignedInteger,
    Boolean,
    IpAddress,
    Port,
    HttpUrl,
    FilePath,
    Enum(&'static [&'static str]),
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for application to start
    Standard, // Important but application can start with defaults
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub default_value: Option<&'static str>,
    pub validation_level: ValidationLevel,
    pub min_value: Option<u64>,
    pub max_value: Option<u64>,
}

pub const CONFIG_PARAMS: &[ConfigParam] = &[
    // Server Configuration
    ConfigParam {
        name: "SPEECH_RELAY_HOST",
        description: "Host IP address for the relay server",
        param_type: ConfigType::IpAddress,
        default_value: Some(defaults::HOST),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "SPEECH_RELAY_PORT",
        description: "Port for the relay server",
        param_type: ConfigType::Port,
        default_value: Some("5000"),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "SPEECH_RELAY_TIMEOUT",
        description: "Client disconnect timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("120"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: "SPEECH_RELAY_KEEPALIVE",
        description: "Keep-alive timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("75"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: "HTTP_WORKER_NUMBER",
        description: "Number of HTTP workers (0 = use CPU cores)",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("0"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(0),
        max_value: Some(64),
    },
    ConfigParam {
        name: "ENABLE_CORS",
        description: "Allow cross-origin requests from any origin",
        param_type: ConfigType::Boolean,
        default_value: Some("true"),
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    // Upload Configuration
    ConfigParam {
        name: "SPEECH_RELAY_UPLOAD_DIR",
        description: "Directory for transient uploads",
        param_type: ConfigType::String,
        default_value: Some(defaults::UPLOAD_DIR),
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "MAX_FILE_SIZE",
        description: "Maximum upload size in bytes",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("10485760"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(1024),
        max_value: Some(1_073_741_824),
    },
    ConfigParam {
        name: "DEFAULT_LANGUAGE",
        description: "Language code used when the request omits `lang`",
        param_type: ConfigType::String,
        default_value: Some(defaults::LANGUAGE),
        validation_level: ValidationLevel::Warning,
        min_value: None,
        max_value: None,
    },
    // Recognition Service Configuration
    ConfigParam {
        name: "GOOGLE_CREDENTIALS_FILE",
        description: "Google service account JSON or API key file",
        param_type: ConfigType::FilePath,
        default_value: Some(defaults::CREDENTIALS_FILE),
        validation_level: ValidationLevel::Warning,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "RECOGNITION_ENDPOINT",
        description: "URL of the synchronous recognize method",
        param_type: ConfigType::HttpUrl,
        default_value: Some(defaults::RECOGNITION_ENDPOINT),
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "RECOGNITION_TIMEOUT_SECONDS",
        description: "Deadline for one recognition call in seconds (0 = none)",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some("60"),
        validation_level: ValidationLevel::Standard,
        min_value: Some(0),
        max_value: Some(3600),
    },
    // Metrics Configuration
    ConfigParam {
        name: "SPEECH_RELAY_METRICS_BACKEND",
        description: "Metrics backend type",
        param_type: ConfigType::Enum(&defaults::METRICS_BACKENDS),
        default_value: Some(defaults::METRICS_BACKEND),
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
];

/// Configuration validation errors with detailed context
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorType {
    InvalidValue,
    InvalidFormat,
    InvalidRange,
    FileNotFound,
    Required,
}

impl ConfigValidationError {
    fn new(field: &str, value: &str, error_type: ConfigErrorType, message: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message: message.to_string(),
            suggestion: None,
        }
    }

    fn suggest<S: Into<String>>(mut self, suggestion: S) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error in '{}' ({:?}): {} (value: '{}')",
            self.field, self.error_type, self.message, self.value
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug, Default)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResults {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, level: ValidationLevel, error: ConfigValidationError) {
        match level {
            ValidationLevel::Critical | ValidationLevel::Standard => self.errors.push(error),
            ValidationLevel::Warning => self.warnings.push(error),
        }
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warning) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warning);
            }
        }

        if self.is_valid() && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid() {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    pub fn validate_boolean(field: &str, value: &str) -> ValidationResult<bool> {
        // Same set `str::parse::<bool>` accepts, which is what config.rs uses
        match value {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                "Invalid boolean value",
            )
            .suggest("Use 'true' or 'false'")),
        }
    }

    pub fn validate_unsigned(
        field: &str,
        value: &str,
        min: Option<u64>,
        max: Option<u64>,
    ) -> ValidationResult<u64> {
        let parsed = value.parse::<u64>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid unsigned integer format",
            )
            .suggest("Use a valid positive integer number")
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    &format!("Value {} is below minimum {}", parsed, min),
                )
                .suggest(format!("Use a value >= {}", min)));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    &format!("Value {} is above maximum {}", parsed, max),
                )
                .suggest(format!("Use a value <= {}", max)));
            }
        }

        Ok(parsed)
    }

    pub fn validate_enum(field: &str, value: &str, valid_values: &[&str]) -> ValidationResult<String> {
        if valid_values.contains(&value) {
            Ok(value.to_string())
        } else {
            Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                &format!("Invalid value, must be one of: {}", valid_values.join(", ")),
            )
            .suggest(format!("Use one of: {}", valid_values.join(", "))))
        }
    }

    pub fn validate_ip_address(field: &str, value: &str) -> ValidationResult<IpAddr> {
        IpAddr::from_str(value).map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid IP address format",
            )
            .suggest("Use a valid IPv4 or IPv6 address (e.g., 127.0.0.1 or ::1)")
        })
    }

    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.parse::<u16>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format",
            )
            .suggest("Use a number between 1 and 65535")
        })?;

        if port == 0 {
            return Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0",
            )
            .suggest("Use a port between 1 and 65535"));
        }

        Ok(port)
    }

    pub fn validate_http_url(field: &str, value: &str) -> ValidationResult<String> {
        let url = reqwest::Url::parse(value).map_err(|e| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                &format!("Invalid URL: {}", e),
            )
        })?;

        match url.scheme() {
            "http" | "https" => Ok(value.to_string()),
            other => Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                &format!("Unsupported URL scheme '{}'", other),
            )
            .suggest("Use an http:// or https:// URL")),
        }
    }

    pub fn validate_file_exists(field: &str, value: &str) -> ValidationResult<String> {
        let path = Path::new(value);
        if !path.is_file() {
            return Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::FileNotFound,
                "File does not exist",
            )
            .suggest("Ensure the file exists and the path is correct"));
        }
        Ok(value.to_string())
    }
}

/// Validator for the relay's configuration parameters
pub struct RelayConfigValidator;

impl RelayConfigValidator {
    /// Validate the process environment
    pub fn validate_env() -> ValidationResults {
        Self::validate_with(|key| env::var(key).ok())
    }

    /// Validate every registered parameter, looking values up through `lookup`
    pub fn validate_with<F>(lookup: F) -> ValidationResults
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::default();

        info!("Starting configuration validation...");

        for param in CONFIG_PARAMS {
            let value = lookup(param.name)
                .or_else(|| param.default_value.map(String::from))
                .unwrap_or_default();

            if value.is_empty() {
                results.record(
                    param.validation_level,
                    ConfigValidationError::new(
                        param.name,
                        "",
                        ConfigErrorType::Required,
                        "Parameter is empty",
                    )
                    .suggest(format!("Set {} or remove it to use the default", param.name)),
                );
                continue;
            }

            if let Err(error) = Self::validate_parameter(param, &value) {
                results.record(param.validation_level, error);
            }
        }

        results
    }

    fn validate_parameter(param: &ConfigParam, value: &str) -> ValidationResult<()> {
        match param.param_type {
            ConfigType::String => {}
            ConfigType::UnsignedInteger => {
                validators::validate_unsigned(param.name, value, param.min_value, param.max_value)?;
            }
            ConfigType::Boolean => {
                validators::validate_boolean(param.name, value)?;
            }
            ConfigType::IpAddress => {
                validators::validate_ip_address(param.name, value)?;
            }
            ConfigType::Port => {
                validators::validate_port(param.name, value)?;
            }
            ConfigType::HttpUrl => {
                validators::validate_http_url(param.name, value)?;
            }
            ConfigType::FilePath => {
                validators::validate_file_exists(param.name, value)?;
            }
            ConfigType::Enum(valid_values) => {
                validators::validate_enum(param.name, value, valid_values)?;
            }
        }
        Ok(())
    }

    /// Generate a sample configuration file with all parameters and descriptions
    pub fn generate_sample_config() -> String {
        let mut output = String::new();
        output.push_str("# Speech relay configuration file\n");
        output.push_str("# Environment variables take precedence over these values\n\n");

        for param in CONFIG_PARAMS {
            output.push_str(&format!("# {}\n", param.description));
            let default = param.default_value.unwrap_or("");
            let rendered = match param.param_type {
                ConfigType::UnsignedInteger | ConfigType::Port | ConfigType::Boolean => {
                    default.to_string()
                }
                _ => format!("\"{}\"", default),
            };
            output.push_str(&format!("{} = {}\n\n", param.name, rendered));
        }
        output
    }
}
