#![forbid(unsafe_code)]

//! Log configuration for native hosts.
//!
//! The engine only emits `tracing` events; it never installs a subscriber
//! on its own. Hosts that have no subscriber can opt into one with the
//! `subscriber` feature:
//!
//! ```ignore
//! hashnav_core::logging::LogConfig::from_env().install()?;
//! ```
//!
//! # Env Var Contract
//!
//! - `HASHNAV_LOG` - filter directive (`EnvFilter` syntax), default `info`
//! - `HASHNAV_LOG_JSON=1|true` - emit JSON lines instead of text
//!
//! `install()` never replaces an existing global subscriber.

use std::env;
use std::fmt;

/// Filter directive used when `HASHNAV_LOG` is unset or empty.
pub const DEFAULT_FILTER: &str = "info";

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `hashnav_core=debug`.
    pub filter: String,
    /// JSON output instead of human-readable text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Read `HASHNAV_LOG` / `HASHNAV_LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("HASHNAV_LOG")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());
        let json = lookup("HASHNAV_LOG_JSON")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        Self { filter, json }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Install a global `fmt` subscriber.
    ///
    /// # Errors
    ///
    /// [`LogInstallError::InvalidFilter`] for a bad directive,
    /// [`LogInstallError::SubscriberAlreadySet`] if a global subscriber
    /// exists.
    #[cfg(feature = "subscriber")]
    pub fn install(&self) -> Result<(), LogInstallError> {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.filter)
            .map_err(|e| LogInstallError::InvalidFilter(e.to_string()))?;
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|_| LogInstallError::SubscriberAlreadySet)
    }
}

/// Failure to install the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogInstallError {
    /// The filter directive did not parse.
    InvalidFilter(String),
    /// A global tracing subscriber is already installed.
    SubscriberAlreadySet,
}

impl fmt::Display for LogInstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(reason) => write!(f, "invalid log filter: {reason}"),
            Self::SubscriberAlreadySet => {
                write!(f, "a global tracing subscriber is already installed")
            }
        }
    }
}

impl std::error::Error for LogInstallError {}
