//! Spawning ffmpeg with an assembled argument vector.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use ffstage_core::{Config, DecodePolicy, Error, ProgressConfig, Result};

use crate::command::FFMPEG;
use crate::progress::{spawn_monitor, MonitorOptions, ProgressStream};
use crate::tools;

/// Flags that turn on machine-readable progress on stderr and silence the
/// human-readable status line. Global options, so they go first.
pub const PROGRESS_ARGS: [&str; 3] = ["-progress", "pipe:2", "-nostats"];

/// Runs ffmpeg commands.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use tokio_util::sync::CancellationToken;
/// use ffstage::{ffmpeg, Runner};
///
/// # async fn example() -> ffstage::Result<()> {
/// let runner = Runner::from_config(&ffstage::Config::default())?;
/// let cmd = ffmpeg().overwrite().input("in.mkv").output("out.mp4").copy_video();
///
/// let mut progress = cmd.run_with_progress(&runner, CancellationToken::new())?;
/// while let Some(p) = progress.next().await {
///     println!("frame {} at {:?}", p.frame, p.out_time);
/// }
/// let end = progress.finish().await?;
/// assert!(end.terminated);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    program: PathBuf,
    timeout: Option<Duration>,
    progress: ProgressConfig,
}

impl Default for Runner {
    /// Runs `ffmpeg` as found on `PATH` at spawn time, without a deadline.
    fn default() -> Self {
        Self::new(FFMPEG)
    }
}

impl Runner {
    /// Run the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            progress: ProgressConfig::default(),
        }
    }

    /// Resolve ffmpeg from the configuration (or `PATH`) and apply the
    /// configured deadline and progress settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let program = tools::resolve_ffmpeg(&config.tools)?;
        Ok(Self {
            program,
            timeout: config.tools.timeout(),
            progress: config.progress.clone(),
        })
    }

    /// Kill the process if it runs longer than `d`.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.progress.decode = policy;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.progress.channel_capacity = capacity;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion with stdout and stderr inherited from the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::Spawn`] if the process cannot be started.
    /// - [`Error::ToolFailed`] if it exits with a non-zero status.
    /// - [`Error::Cancelled`] / [`Error::Timeout`] if it was killed.
    pub async fn run(&self, args: &[String], cancel: &CancellationToken) -> Result<()> {
        let tool = self.tool_name();
        tracing::info!("Running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn(&tool, e))?;

        let deadline = async {
            match self.timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };

        let halt = tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    return Ok(());
                }
                tracing::warn!("{tool} exited with {status}");
                return Err(Error::tool_failed(&tool, status, ""));
            }
            _ = cancel.cancelled() => Error::Cancelled { tool: tool.clone() },
            _ = deadline => Error::Timeout {
                tool: tool.clone(),
                after: self.timeout.unwrap_or_default(),
            },
        };

        tracing::warn!("Killing {tool}: {halt}");
        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to kill {tool}: {e}");
        }
        Err(halt)
    }

    /// Start the process with [`PROGRESS_ARGS`] and return immediately.
    ///
    /// Must be called from within a tokio runtime: the decoding task is
    /// spawned onto it.
    ///
    /// # Errors
    ///
    /// [`Error::Spawn`] if the process cannot be started. Failures of the
    /// process itself are reported by [`ProgressStream::finish`].
    pub fn run_with_progress(
        &self,
        args: &[String],
        cancel: CancellationToken,
    ) -> Result<ProgressStream> {
        let tool = self.tool_name();
        let full = progress_args(args);
        tracing::info!("Running {} {}", self.program.display(), full.join(" "));

        let child = Command::new(&self.program)
            .args(&full)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn(&tool, e))?;

        let opts = MonitorOptions {
            tool,
            policy: self.progress.decode,
            capacity: self.progress.channel_capacity,
            tail_lines: self.progress.stderr_tail_lines,
            timeout: self.timeout,
        };
        spawn_monitor(child, opts, cancel)
    }
}

/// Prepend [`PROGRESS_ARGS`] to an assembled argument vector.
pub fn progress_args(args: &[String]) -> Vec<String> {
    PROGRESS_ARGS
        .iter()
        .map(|s| s.to_string())
        .chain(args.iter().cloned())
        .collect()
}
