use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity of the provider SDK's own request tracing. Independent of the
/// process-wide tracing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Error = 1,
    Silent = 2,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(format!(
                "Invalid SDK log level '{}'. Valid values: debug, error, silent",
                other
            )),
        }
    }
}

/// The SDK's log level setter. Injectable so callers can observe or
/// redirect level changes.
pub trait SdkLog: Send + Sync {
    fn set_log_level(&self, level: LogLevel);
    fn log_level(&self) -> LogLevel;

    fn is_debug(&self) -> bool {
        self.log_level() == LogLevel::Debug
    }
}

/// Default `SdkLog`: an atomic level, `error` until raised.
#[derive(Debug)]
pub struct SdkLogger {
    level: AtomicU8,
}

impl SdkLogger {
    pub fn new() -> Self {
        SdkLogger {
            level: AtomicU8::new(LogLevel::Error as u8),
        }
    }
}

impl Default for SdkLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkLog for SdkLogger {
    fn set_log_level(&self, level: LogLevel) {
        tracing::info!("Provider SDK log level set to '{}'", level);
        self.level.store(level as u8, Ordering::Relaxed);
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }
}
