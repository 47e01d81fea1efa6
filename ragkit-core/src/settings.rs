//! Runtime configuration
//!
//! Settings are read from the environment once at startup and validated
//! eagerly; components receive plain values, never the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::vector::RetrievalMode;

/// Read a trimmed environment variable, treating empty as unset
pub(crate) fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_var(key) {
        None => Ok(default),
        Some(v) => parse_bool(&v)
            .ok_or_else(|| Error::validation(format!("{} must be a boolean, got '{}'", key, v))),
    }
}

/// Accepts the usual spellings of a boolean setting
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Vector database connection and lifecycle settings
#[derive(Debug, Clone)]
pub struct VectorDbSettings {
    /// The production alias; snapshots are named `<alias>_<timestamp>`
    pub collection_name: String,
    /// Endpoint of the vector database
    pub location: String,
    /// How many snapshots to retain after a switch
    pub collection_history_count: u32,
    /// Whether to verify the vector configuration of existing collections
    pub validate_collection_config: bool,
    /// Which retrieval legs to run
    pub retrieval_mode: RetrievalMode,
}

impl VectorDbSettings {
    /// Load from `VECTOR_DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        let collection_name = env_var("VECTOR_DB_COLLECTION_NAME")
            .ok_or_else(|| Error::validation("VECTOR_DB_COLLECTION_NAME is not set"))?;
        let location =
            env_var("VECTOR_DB_LOCATION").unwrap_or_else(|| "http://localhost:6333".to_string());

        let collection_history_count = match env_var("VECTOR_DB_COLLECTION_HISTORY_COUNT") {
            None => 1,
            Some(v) => v.parse::<u32>().ok().filter(|n| *n >= 1).ok_or_else(|| {
                Error::validation(format!(
                    "VECTOR_DB_COLLECTION_HISTORY_COUNT must be an integer >= 1, got '{}'",
                    v
                ))
            })?,
        };

        let validate_collection_config = env_bool("VECTOR_DB_VALIDATE_COLLECTION_CONFIG", false)?;

        let retrieval_mode = match env_var("VECTOR_DB_RETRIEVAL_MODE") {
            None => RetrievalMode::Hybrid,
            Some(v) => RetrievalMode::parse(&v).ok_or_else(|| {
                Error::validation(format!(
                    "VECTOR_DB_RETRIEVAL_MODE must be DENSE, SPARSE or HYBRID, got '{}'",
                    v
                ))
            })?,
        };

        Ok(Self {
            collection_name,
            location,
            collection_history_count,
            validate_collection_config,
            retrieval_mode,
        })
    }
}

/// Source uploader tuning
#[derive(Debug, Clone)]
pub struct UploaderSettings {
    /// Deadline for a single upload pipeline
    pub timeout: Duration,
    /// TTL of status entries
    pub status_ttl: Duration,
}

impl Default for UploaderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            status_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl UploaderSettings {
    /// Load from `UPLOAD_TIMEOUT_SECS` / `STATUS_TTL_SECS`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let timeout = match env_var("UPLOAD_TIMEOUT_SECS") {
            None => defaults.timeout,
            Some(v) => Duration::from_secs(v.parse::<u64>().map_err(|_| {
                Error::validation(format!("UPLOAD_TIMEOUT_SECS must be an integer, got '{}'", v))
            })?),
        };
        let status_ttl = match env_var("STATUS_TTL_SECS") {
            None => defaults.status_ttl,
            Some(v) => Duration::from_secs(v.parse::<u64>().map_err(|_| {
                Error::validation(format!("STATUS_TTL_SECS must be an integer, got '{}'", v))
            })?),
        };
        Ok(Self { timeout, status_ttl })
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Default log level when `RUST_LOG` is not set
    pub level: String,
    /// Directory for rolling log files; console-only when unset
    pub directory: Option<PathBuf>,
    /// File name prefix of the rolling log files
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "ragkit.log".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Load from `LOG_LEVEL` / `LOG_DIRECTORY` / `LOG_FILE_PREFIX`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env_var("LOG_LEVEL").unwrap_or(defaults.level),
            directory: env_var("LOG_DIRECTORY").map(PathBuf::from),
            file_prefix: env_var("LOG_FILE_PREFIX").unwrap_or(defaults.file_prefix),
        }
    }
}
