//! Runtime configuration.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section
//! defaults sensibly so an empty file is valid.
//!
//! ```toml
//! [tools]
//! ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
//! timeout_secs = 3600
//!
//! [progress]
//! channel_capacity = 32
//! decode = "strict"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub progress: ProgressConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist or cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

/// Where to find ffmpeg and how long it may run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffmpeg binary. Falls back to `PATH` when unset or missing.
    pub ffmpeg_path: Option<PathBuf>,
    /// Kill the process after this many seconds. No deadline when unset.
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// How strictly the `-progress` stream is judged once the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Skip malformed values and fail only on the exit status.
    #[default]
    Lenient,
    /// Also fail a successful run whose stream had malformed values or
    /// never reached `progress=end`.
    Strict,
}

/// Progress monitoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Capacity of the snapshot channel between the decoding task and the
    /// consumer.
    pub channel_capacity: usize,
    /// Number of trailing non-progress stderr lines kept for error reports.
    pub stderr_tail_lines: usize,
    pub decode: DecodePolicy,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            stderr_tail_lines: 20,
            decode: DecodePolicy::Lenient,
        }
    }
}
