use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogFormat;

/// Level used whenever debug mode is on
pub const DEBUG_LEVEL: &str = "debug";

pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub debug_mode: bool,
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn effective_level(&self) -> &str {
        if self.debug_mode {
            DEBUG_LEVEL
        } else {
            &self.level
        }
    }
}

pub fn init_logging(config: &LoggingConfig) {
    let level = config.effective_level();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
    };

    match result {
        Ok(()) => tracing::debug!("Logging initialized with level: {}", level),
        Err(e) => tracing::warn!("Logging already initialized: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_mode_overrides_level() {
        let mut config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            debug_mode: false,
        };
        assert_eq!(config.effective_level(), "warn");

        config.debug_mode = true;
        assert_eq!(config.effective_level(), "debug");
    }
}
