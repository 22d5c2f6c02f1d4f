//! Logging setup for the stepguard binary and embedding applications.
//!
//! Logs go to stderr so that the JSON written to stdout stays parseable.
//! `STEPGUARD_LOG` takes precedence over `RUST_LOG`; both use `EnvFilter`
//! directive syntax.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "STEPGUARD_LOG";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Default: only problems are reported.
    #[default]
    Warn,
    Error,
    /// Disable logging entirely
    Off,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<u8> for LogLevel {
    /// Convert a `-v` count to a level.
    /// 0 = Warn, 1 = Info, 2 = Debug, 3+ = Trace
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Configuration for the subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub with_timestamps: bool,
    /// Include the module path of each event
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            with_timestamps: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Build from CLI flags. `quiet` wins over any verbosity.
    pub fn from_flags(verbosity: u8, quiet: bool) -> Self {
        let level = if quiet {
            LogLevel::Off
        } else {
            LogLevel::from(verbosity)
        };
        Self::default().with_level(level)
    }

    /// `Off` ignores the environment; otherwise the first valid variable wins.
    fn env_filter(&self) -> EnvFilter {
        if self.level == LogLevel::Off {
            return EnvFilter::new(LogLevel::Off.as_directive());
        }
        for var in [LOG_ENV_VAR, "RUST_LOG"] {
            if let Ok(directives) = std::env::var(var) {
                if let Ok(filter) = EnvFilter::try_new(directives) {
                    return filter;
                }
            }
        }
        EnvFilter::new(self.level.as_directive())
    }
}

/// Install the global subscriber.
///
/// Returns false if a subscriber was already installed, which happens when a
/// host application set up its own logging first.
///
/// # Examples
///
/// ```no_run
/// use stepguard::logging::{init_logging, LogLevel, LoggingConfig};
///
/// init_logging(LoggingConfig::new().with_level(LogLevel::Debug));
/// ```
pub fn init_logging(config: LoggingConfig) -> bool {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let installed = if config.with_timestamps {
        subscriber.try_init().is_ok()
    } else {
        subscriber.without_time().try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = config.level.as_directive(), "logging initialized");
    }
    installed
}
