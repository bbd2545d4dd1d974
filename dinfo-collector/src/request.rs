//! Collection request payload.
//!
//! The payload is a JSON object such as
//! `{"level": "critical", "use_persistent_storage": true}`. Both keys are
//! optional; anything that is not a JSON object is rejected whole.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Key holding the requested log level.
pub const LOG_LEVEL_KEY: &str = "level";

/// Key holding the persistent-storage flag.
pub const PERSISTENT_STORAGE_KEY: &str = "use_persistent_storage";

/// Errors from request parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// How much to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Common host artifacts only.
    #[default]
    Alert,
    /// Adds counters (pre and post) and database dumps.
    Critical,
    /// Same artifact set as `Critical`.
    All,
}

impl LogLevel {
    /// Whether counter snapshots and database dumps are collected.
    pub fn collects_counters(self) -> bool {
        matches!(self, LogLevel::Critical | LogLevel::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Alert => "alert",
            LogLevel::Critical => "critical",
            LogLevel::All => "all",
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
        match s {
            "alert" => Ok(LogLevel::Alert),
            "critical" => Ok(LogLevel::Critical),
            "all" => Ok(LogLevel::All),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A parsed collection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectionRequest {
    pub log_level: LogLevel,
    pub use_persistent_storage: bool,
}

impl CollectionRequest {
    /// Parse a raw payload.
    ///
    /// Unknown or non-string levels fall back to `alert`. The persistence flag
    /// follows JSON truthiness so `1` or `"yes"` enable it and `null` does not.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|_| RequestError::InvalidInput(raw.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| RequestError::InvalidInput(raw.to_string()))?;

        let log_level = object
            .get(LOG_LEVEL_KEY)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let use_persistent_storage = object
            .get(PERSISTENT_STORAGE_KEY)
            .map(truthy)
            .unwrap_or(false);

        Ok(Self {
            log_level,
            use_persistent_storage,
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
