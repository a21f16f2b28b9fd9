// ============================================================================
// Logging Configuration
// ============================================================================

/// Output format for the fmt layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Include the module target in each log line
    pub with_target: bool,
}

impl LoggingConfig {
    pub(crate) fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            format,
            with_target: std::env::var("LOG_WITH_TARGET")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }
}
