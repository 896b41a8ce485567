//! Logging utilities and configuration for Deep Miner.
//!
//! Phase-level events are always emitted through `tracing`. Per-pair detail
//! and per-row sink operations can run into the hundreds of thousands of
//! events for a large census, so they are gated by [`LogConfig`] through the
//! [`log_pair!`](crate::log_pair) and [`log_sink_op!`](crate::log_sink_op)
//! macros.

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Logging configuration for a mining session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base log level for engine components
    #[serde(with = "level_serde")]
    pub base_level: Level,
    /// Whether to log every evaluated pair (cross-tab, subgroup, temporal)
    pub log_pair_details: bool,
    /// Whether to log individual sink writes
    pub log_sink_operations: bool,
    /// Maximum length for logged field values (interpretations, paths)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_pair_details: false,
            log_sink_operations: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_pair_details: true,
            log_sink_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_pair_details: false,
            log_sink_operations: false,
            max_field_length: 128,
        }
    }

    /// Whether engine-internal debug events are emitted.
    pub fn detail_enabled(&self) -> bool {
        self.base_level >= Level::DEBUG
    }

    /// Cuts a logged value to `max_field_length`.
    pub fn clip(&self, value: &str) -> String {
        truncate_field(value, self.max_field_length)
    }
}

mod level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

/// Logs an engine-internal debug event when the base level admits it.
#[macro_export]
macro_rules! log_detail {
    ($config:expr, $($arg:tt)*) => {
        if $config.detail_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs per-pair detail at debug level when enabled.
#[macro_export]
macro_rules! log_pair {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_pair_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs a sink write at debug level when enabled.
#[macro_export]
macro_rules! log_sink_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_sink_operations {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
///
/// Cuts on a character boundary so multi-byte text never panics.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut cut = max_length;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...(truncated)", &value[..cut])
}

/// Subscriber setup for binaries and tests that embed the engine.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global `tracing` subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything outside the engine
        pub level: Level,
        /// Log level for `deep_miner` targets
        pub miner_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                miner_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                miner_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                miner_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_miner_level(mut self, level: Level) -> Self {
            self.miner_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},deep_miner={}",
                    self.level.as_str().to_lowercase(),
                    self.miner_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter. Fails if a
    /// global subscriber is already set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use deep_miner::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
