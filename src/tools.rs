//! Locating the ffmpeg binary.
//!
//! An explicit path from [`ToolsConfig`] wins when it exists; otherwise
//! [`which::which`] searches `PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ffstage_core::{Error, Result, ToolsConfig};

use crate::command::FFMPEG;

/// Availability information for the ffmpeg binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `ffmpeg -version`, if it could be run.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolve the ffmpeg executable for the given configuration.
pub fn resolve_ffmpeg(config: &ToolsConfig) -> Result<PathBuf> {
    if let Some(p) = config.ffmpeg_path.as_deref() {
        if p.exists() {
            return Ok(p.to_path_buf());
        }
        tracing::warn!(
            "Configured ffmpeg path {} does not exist; searching PATH",
            p.display()
        );
    }
    which::which(FFMPEG).map_err(|_| Error::tool_not_found(FFMPEG))
}

/// Resolve ffmpeg and report its version, without failing when it is
/// missing.
pub fn check_ffmpeg(config: &ToolsConfig) -> ToolInfo {
    match resolve_ffmpeg(config) {
        Ok(path) => ToolInfo {
            name: FFMPEG.to_string(),
            available: true,
            version: probe_version(&path),
            path: Some(path),
        },
        Err(_) => ToolInfo {
            name: FFMPEG.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Run `<path> -version` and return the first line of stdout.
pub fn probe_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
