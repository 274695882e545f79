//! Decoding ffmpeg's `-progress` stream into [`Progress`] snapshots.
//!
//! With `-progress pipe:2` ffmpeg periodically writes blocks of `key=value`
//! lines to stderr, each block closed by `progress=continue` (or
//! `progress=end` for the last one). Anything else on stderr (warnings,
//! errors) is interleaved with those blocks and skipped by the decoder.
//!
//! [`ProgressDecoder`] is the pure line protocol. [`ProgressStream`] is the
//! consumer side of a running process: one task owns the child and its
//! stderr pipe, decodes lines and hands snapshots over a bounded channel.

use std::collections::VecDeque;
use std::pin::Pin;
use std::process::ExitStatus;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ffstage_core::{parse_timestamp, DecodePolicy, Error, Result};

/// Longest stderr line the monitor buffers. Anything longer is discarded up
/// to the next newline and counted as skipped.
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Latest known values of the transcoding metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Progress {
    pub frame: u64,
    pub fps: f64,
    /// Verbatim, e.g. `1024.5kbits/s` or `N/A`.
    pub bitrate: String,
    pub out_time: Duration,
    /// Without the trailing `x`, e.g. `1.5`.
    pub speed: String,
}

/// Result of feeding one line to the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Not a progress record.
    Ignored,
    /// A field of the running snapshot was updated (or its value was
    /// malformed and left unchanged).
    Field,
    /// `progress=continue`: emit this snapshot and keep going.
    Snapshot(Progress),
    /// `progress=end`: emit this snapshot and stop.
    End(Progress),
}

/// Incremental decoder for the `-progress` line protocol.
#[derive(Debug, Default)]
pub struct ProgressDecoder {
    current: Progress,
    snapshots: usize,
    anomalies: usize,
    skipped: usize,
    terminated: bool,
}

impl ProgressDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (with or without its line ending).
    pub fn feed(&mut self, line: &str) -> Decoded {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((key, value)) = line.split_once('=') else {
            self.skipped += 1;
            return Decoded::Ignored;
        };
        let value = value.trim();

        match key.trim() {
            "frame" => self.update(value.parse().ok(), |p, v| p.frame = v),
            "fps" => self.update(value.parse().ok(), |p, v| p.fps = v),
            "bitrate" => self.current.bitrate = value.to_string(),
            "out_time" => self.update(parse_timestamp(value), |p, v| p.out_time = v),
            "speed" => {
                self.current.speed = value.strip_suffix('x').unwrap_or(value).trim().to_string()
            }
            "progress" => {
                self.snapshots += 1;
                let snapshot = self.current.clone();
                if value == "end" {
                    self.terminated = true;
                    return Decoded::End(snapshot);
                }
                return Decoded::Snapshot(snapshot);
            }
            _ => {
                self.skipped += 1;
                return Decoded::Ignored;
            }
        }
        Decoded::Field
    }

    fn update<T>(&mut self, parsed: Option<T>, apply: impl FnOnce(&mut Progress, T)) {
        match parsed {
            Some(v) => apply(&mut self.current, v),
            None => self.anomalies += 1,
        }
    }

    fn skip_line(&mut self) {
        self.skipped += 1;
    }

    /// The snapshot as accumulated so far.
    pub fn current(&self) -> &Progress {
        &self.current
    }

    pub fn summary(&self) -> StreamEnd {
        StreamEnd {
            terminated: self.terminated,
            snapshots: self.snapshots,
            anomalies: self.anomalies,
            skipped: self.skipped,
        }
    }
}

/// How a monitored run that exited successfully went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamEnd {
    /// A `progress=end` record was seen.
    pub terminated: bool,
    /// Snapshots decoded (not necessarily all delivered, if the consumer
    /// went away).
    pub snapshots: usize,
    /// Recognised keys whose value failed to parse.
    pub anomalies: usize,
    /// Lines that were not progress records.
    pub skipped: usize,
}

impl StreamEnd {
    fn check(self, policy: DecodePolicy) -> Result<Self> {
        if policy == DecodePolicy::Strict && (self.anomalies > 0 || !self.terminated) {
            return Err(Error::Decode {
                anomalies: self.anomalies,
                terminated: self.terminated,
            });
        }
        Ok(self)
    }
}

/// Snapshots of a running ffmpeg process.
///
/// Implements [`Stream`]; the stream ends when ffmpeg writes
/// `progress=end`, closes stderr, or the run is cancelled. Call
/// [`finish`](Self::finish) afterwards to learn how the process exited.
/// Dropping the stream early is fine: the monitor stops delivering,
/// keeps draining stderr and reaps the process once it exits.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::Receiver<Progress>,
    task: JoinHandle<Result<StreamEnd>>,
}

impl ProgressStream {
    /// Stop receiving and wait for the process to exit.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolFailed`] if ffmpeg exited unsuccessfully, including
    ///   after a clean `progress=end`.
    /// - [`Error::Cancelled`] / [`Error::Timeout`] if the child was killed.
    /// - [`Error::Decode`] under [`DecodePolicy::Strict`] when the stream
    ///   was malformed or cut short.
    pub async fn finish(self) -> Result<StreamEnd> {
        let ProgressStream { rx, task } = self;
        drop(rx);
        task.await
            .map_err(|e| Error::Internal(format!("progress monitor task failed: {e}")))?
    }
}

impl Stream for ProgressStream {
    type Item = Progress;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Progress>> {
        self.rx.poll_recv(cx)
    }
}

/// Everything the monitor task needs besides the child itself.
#[derive(Debug, Clone)]
pub(crate) struct MonitorOptions {
    pub tool: String,
    pub policy: DecodePolicy,
    pub capacity: usize,
    pub tail_lines: usize,
    pub timeout: Option<Duration>,
}

/// Spawn the monitor task for a child whose stderr is piped.
pub(crate) fn spawn_monitor(
    mut child: Child,
    opts: MonitorOptions,
    cancel: CancellationToken,
) -> Result<ProgressStream> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Internal("child stderr was not piped".into()))?;
    let (tx, rx) = mpsc::channel(opts.capacity.max(1));
    let task = tokio::spawn(monitor(child, stderr, tx, opts, cancel));
    Ok(ProgressStream { rx, task })
}

/// Bounded record of the most recent non-progress stderr lines.
#[derive(Debug)]
struct StderrTail {
    lines: VecDeque<String>,
    cap: usize,
}

impl StderrTail {
    fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(cap),
            cap,
        }
    }

    fn push(&mut self, line: &str) {
        if self.cap == 0 || line.trim().is_empty() {
            return;
        }
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(line.trim().to_string());
    }

    fn joined(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

enum Halt {
    Cancelled,
    TimedOut(Duration),
}

async fn monitor<R>(
    mut child: Child,
    stderr: R,
    tx: mpsc::Sender<Progress>,
    opts: MonitorOptions,
    cancel: CancellationToken,
) -> Result<StreamEnd>
where
    R: AsyncRead + Unpin,
{
    let deadline = deadline(opts.timeout);
    tokio::pin!(deadline);

    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut decoder = ProgressDecoder::new();
    let mut tail = StderrTail::new(opts.tail_lines);
    let mut tx = Some(tx);
    let mut decoding = true;
    let mut discarding = false;

    let halt = loop {
        buf.clear();
        let mut limited = (&mut reader).take(MAX_LINE_BYTES);
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Some(Halt::Cancelled),
            _ = &mut deadline => break Some(Halt::TimedOut(opts.timeout.unwrap_or_default())),
            read = limited.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break None,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Reading {} stderr failed: {e}", opts.tool);
                break None;
            }
        }

        let complete = buf.last() == Some(&b'\n');
        if discarding {
            discarding = !complete;
            continue;
        }
        if !complete && buf.len() as u64 == MAX_LINE_BYTES {
            tracing::debug!("{}: discarding stderr line over {MAX_LINE_BYTES} bytes", opts.tool);
            decoder.skip_line();
            discarding = true;
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        if !decoding {
            tail.push(&line);
            continue;
        }

        let (snapshot, last) = match decoder.feed(&line) {
            Decoded::Ignored => {
                tracing::debug!("{}: {}", opts.tool, line.trim_end());
                tail.push(&line);
                continue;
            }
            Decoded::Field => continue,
            Decoded::Snapshot(p) => (p, false),
            Decoded::End(p) => (p, true),
        };

        if let Some(sender) = &tx {
            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(Halt::Cancelled),
                _ = &mut deadline => break Some(Halt::TimedOut(opts.timeout.unwrap_or_default())),
                sent = sender.send(snapshot) => sent.is_ok(),
            };
            if !delivered {
                tracing::debug!("Progress consumer went away; draining {} stderr", opts.tool);
                tx = None;
            }
        }

        if last {
            // Close the sequence now, keep reading so the pipe never fills.
            tx = None;
            decoding = false;
        }
    };
    drop(tx);

    if let Some(halt) = halt {
        return Err(kill(&mut child, &opts.tool, halt).await);
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(kill(&mut child, &opts.tool, Halt::Cancelled).await),
        _ = &mut deadline => {
            let after = opts.timeout.unwrap_or_default();
            return Err(kill(&mut child, &opts.tool, Halt::TimedOut(after)).await);
        }
        status = child.wait() => status?,
    };

    finish_status(&opts.tool, status, &tail)?;
    let end = decoder.summary();
    tracing::info!(
        "{} finished: {} snapshot(s), terminated={}, anomalies={}",
        opts.tool,
        end.snapshots,
        end.terminated,
        end.anomalies
    );
    end.check(opts.policy)
}

fn finish_status(tool: &str, status: ExitStatus, tail: &StderrTail) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    tracing::warn!("{tool} exited with {status}");
    Err(Error::tool_failed(tool, status, tail.joined()))
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

/// Kill and reap the child, returning the error describing why.
async fn kill(child: &mut Child, tool: &str, halt: Halt) -> Error {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill {tool}: {e}");
    }
    match halt {
        Halt::Cancelled => {
            tracing::warn!("{tool} cancelled");
            Error::Cancelled {
                tool: tool.to_string(),
            }
        }
        Halt::TimedOut(after) => {
            tracing::warn!("{tool} timed out after {after:?}");
            Error::Timeout {
                tool: tool.to_string(),
                after,
            }
        }
    }
}
