//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rivet_core::{AuthMode, SessionOptions};
use serde::{Deserialize, Serialize};

/// Default remote endpoint.
pub const DEFAULT_ENDPOINT: &str = "jp.mcfallout.net";

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RivetConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// One entry per supervised account.
    #[serde(default)]
    pub bots: Vec<SupervisorConfig>,
}

// =============================================================================
// Supervisor
// =============================================================================

/// Settings for one supervised account.
///
/// Field names from older config files (`username`, `password`,
/// `white_list`) are accepted as aliases.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Account name, unique per registry.
    #[serde(alias = "username")]
    pub identity: String,

    /// Account credential.
    #[serde(alias = "password", default)]
    pub secret: String,

    /// Players allowed to command the bot, in order.
    #[serde(alias = "white_list", default)]
    pub allow_list: Vec<String>,

    /// Log back in automatically after the session ends.
    #[serde(default)]
    pub auto_reconnect: bool,

    /// Remote host to connect to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Authentication mode.
    #[serde(default)]
    pub auth: AuthMode,

    /// Delay before a reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl SupervisorConfig {
    /// Creates a config with defaults for everything but the credentials.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
            allow_list: Vec::new(),
            auto_reconnect: false,
            endpoint: default_endpoint(),
            auth: AuthMode::default(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    pub fn with_allow_list<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn is_allowed(&self, user: &str) -> bool {
        self.allow_list.iter().any(|allowed| allowed == user)
    }

    /// The options passed to the connector when logging in.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            identity: self.identity.clone(),
            secret: self.secret.clone(),
            endpoint: self.endpoint.clone(),
            auth: self.auth,
        }
    }
}

impl fmt::Debug for SupervisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorConfig")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("allow_list", &self.allow_list)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .field("reconnect_delay_ms", &self.reconnect_delay_ms)
            .finish()
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file path when `output` is `file`.
    pub file_path: Option<PathBuf>,

    /// Log file rotation when `output` is `file`.
    pub rotation: LogRotation,

    /// Per-target level overrides, e.g. `rivet_runtime = "debug"`.
    pub filters: HashMap<String, LogLevel>,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include source file and line.
    pub file_location: bool,

    /// Which span lifecycle events to log.
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            filters: HashMap::new(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub close: bool,
}
