//! Structured logging.

use crate::config::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Parses a format name, falling back to JSON for anything unknown.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" | "human" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Level filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// The filter directive comes from the settings (already merged with
    /// `RUST_LOG`) and defaults to `info`, or `debug` when `verbose` is set.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = settings
            .and_then(|s| s.format.as_deref())
            .map(LogFormat::parse)
            .unwrap_or_default();

        let fallback = if verbose { "debug" } else { "info" };
        let directive = settings
            .and_then(|s| s.filter.as_deref())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(fallback);
        let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(fallback));

        Self { format, filter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", LogFormat::Json)]
    #[test_case("Pretty", LogFormat::Pretty)]
    #[test_case("text", LogFormat::Pretty)]
    #[test_case("yaml", LogFormat::Json)]
    fn test_parse_format(input: &str, expected: LogFormat) {
        assert_eq!(LogFormat::parse(input), expected);
    }

    #[test]
    fn test_defaults_to_json_info() {
        let config = LoggingConfig::from_settings(None, false);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter.to_string(), "info");
    }

    #[test]
    fn test_verbose_defaults_to_debug() {
        let config = LoggingConfig::from_settings(None, true);
        assert_eq!(config.filter.to_string(), "debug");
    }

    #[test]
    fn test_explicit_filter_wins_over_verbose() {
        let settings = LoggingSettings {
            format: Some("pretty".to_string()),
            filter: Some("outlay=trace".to_string()),
        };
        let config = LoggingConfig::from_settings(Some(&settings), true);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.to_string(), "outlay=trace");
    }
}
