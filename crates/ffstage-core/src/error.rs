//! Unified error type for ffstage.
//!
//! Building a command cannot fail: stage ordering is enforced by the type
//! system. Everything that can go wrong at run time (locating ffmpeg,
//! spawning it, the process failing, cancellation) is funnelled into
//! [`Error`] so callers can match on the failure kind.

use std::process::ExitStatus;
use std::time::Duration;

/// Unified error type covering all failure modes in ffstage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command was used in a way its stage does not allow at run time
    /// (for example, running it without an output path).
    #[error("Build contract violation: {0}")]
    Contract(String),

    /// The external binary could not be located.
    #[error("Tool not found: {tool}")]
    ToolNotFound {
        /// Name of the binary that was looked up.
        tool: String,
    },

    /// The external binary exists but could not be started.
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        /// Name of the binary.
        tool: String,
        /// The OS error returned by the spawn call.
        source: std::io::Error,
    },

    /// The process started but exited unsuccessfully.
    #[error("Tool error [{tool}]: exited with {status}{}", stderr_suffix(.stderr))]
    ToolFailed {
        /// Name of the binary.
        tool: String,
        /// Raw exit status of the process.
        status: ExitStatus,
        /// Last lines the process wrote to stderr, if they were captured.
        stderr: String,
    },

    /// The run was cancelled and the child was killed.
    #[error("Tool error [{tool}]: cancelled")]
    Cancelled {
        /// Name of the binary.
        tool: String,
    },

    /// The run exceeded its deadline and the child was killed.
    #[error("Tool error [{tool}]: timed out after {after:?}")]
    Timeout {
        /// Name of the binary.
        tool: String,
        /// The configured deadline.
        after: Duration,
    },

    /// The process succeeded but its progress stream looked wrong. Only
    /// raised under [`DecodePolicy::Strict`](crate::DecodePolicy::Strict).
    #[error("Progress decode error: {anomalies} malformed value(s), terminated={terminated}")]
    Decode {
        /// Recognised keys whose value could not be parsed.
        anomalies: usize,
        /// Whether a `progress=end` record was seen.
        terminated: bool,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl Error {
    /// Convenience constructor for [`Error::ToolNotFound`].
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Error::ToolNotFound { tool: tool.into() }
    }

    /// Convenience constructor for [`Error::Spawn`].
    pub fn spawn(tool: impl Into<String>, source: std::io::Error) -> Self {
        Error::Spawn {
            tool: tool.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::ToolFailed`].
    pub fn tool_failed(tool: impl Into<String>, status: ExitStatus, stderr: impl Into<String>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Whether the external process itself failed (as opposed to the
    /// caller cancelling it or the stream decoding going wrong).
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Error::ToolFailed { .. })
    }

    /// Exit code of a failed tool, when the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::ToolFailed { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_display() {
        let err = Error::Contract("no output path".into());
        assert_eq!(err.to_string(), "Build contract violation: no output path");
    }

    #[test]
    fn tool_not_found_display() {
        let err = Error::tool_not_found("ffmpeg");
        assert_eq!(err.to_string(), "Tool not found: ffmpeg");
    }

    #[test]
    fn spawn_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::spawn("ffmpeg", io_err);
        assert_eq!(err.to_string(), "Failed to spawn ffmpeg: denied");
        assert!(!err.is_tool_failure());
    }

    #[cfg(unix)]
    #[test]
    fn tool_failed_carries_status() {
        use std::os::unix::process::ExitStatusExt;

        let err = Error::tool_failed("ffmpeg", ExitStatus::from_raw(1 << 8), "Invalid argument");
        assert!(err.is_tool_failure());
        assert_eq!(err.exit_code(), Some(1));
        let msg = err.to_string();
        assert!(msg.starts_with("Tool error [ffmpeg]: exited with"), "{msg}");
        assert!(msg.ends_with(": Invalid argument"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn tool_failed_without_stderr() {
        use std::os::unix::process::ExitStatusExt;

        let err = Error::tool_failed("ffmpeg", ExitStatus::from_raw(2 << 8), "");
        assert!(!err.to_string().ends_with(": "));
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout {
            tool: "ffmpeg".into(),
            after: Duration::from_millis(100),
        };
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: timed out after 100ms");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.exit_code(), None);
    }
}
