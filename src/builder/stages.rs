//! Stage types of the command builder.
//!
//! ffmpeg's command line has a grammar: options before an `-i` apply to that
//! input's decoding, options after every input apply to the output's
//! encoding, and the output path comes last. Each stage below only exposes
//! the operations that are legal at its position, and every transition moves
//! the [`BuilderState`] into the next stage. There is no way back, so an
//! out-of-order command does not compile.
//!
//! ```text
//! BeforeRead --input--> Read --filter--> FilterStage --simple--> SimpleFilters --done--+
//!                         |                    \--complex--> ComplexFilters --done--+  |
//!                         \--output----------------------------------------------> Write
//! ```

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ffstage_core::{format_timestamp, AtomicFilter, Chain, FilterNode, Result, SimpleFilterKind};

use super::state::BuilderState;
use crate::command;
use crate::progress::ProgressStream;
use crate::runner::Runner;

/// Stream selector used by [`Write::codec_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

impl StreamType {
    pub fn specifier(self) -> &'static str {
        match self {
            StreamType::Video => "v",
            StreamType::Audio => "a",
            StreamType::Subtitle => "s",
        }
    }
}

/// Values accepted by `-loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Start a new ffmpeg command.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// let cmd = ffstage::ffmpeg()
///     .overwrite()
///     .input("movie.mkv")
///     .limit_duration(Duration::from_secs(30))
///     .output("out.mkv")
///     .video_codec("libx264")
///     .crf(22);
///
/// assert_eq!(
///     cmd.build(),
///     "ffmpeg -y -t 00:00:30.000 -i movie.mkv -c:v libx264 -crf 22 out.mkv"
/// );
/// ```
pub fn ffmpeg() -> BeforeRead {
    BeforeRead::new()
}

/// Initial stage: global options and options applied before the first input.
#[derive(Debug, Clone, Default)]
pub struct BeforeRead {
    state: BuilderState,
}

impl BeforeRead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass an argument through verbatim, ahead of every input.
    pub fn raw(mut self, arg: impl Into<String>) -> Self {
        self.state.push_pre_read([arg]);
        self
    }

    /// `-y`: overwrite the output without asking.
    pub fn overwrite(self) -> Self {
        self.raw("-y")
    }

    /// `-n`: never overwrite an existing output.
    pub fn no_overwrite(self) -> Self {
        self.raw("-n")
    }

    pub fn hide_banner(self) -> Self {
        self.raw("-hide_banner")
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.state.push_pre_read(["-loglevel", level.as_str()]);
        self
    }

    /// `-ss` before the first input: fast (keyframe) seek on the input.
    pub fn seek(mut self, d: Duration) -> Self {
        self.state.push_pre_read(["-ss".to_string(), format_timestamp(d)]);
        self
    }

    /// `-to` before the first input: stop reading at this input timestamp.
    pub fn end_at(mut self, d: Duration) -> Self {
        self.state.push_pre_read(["-to".to_string(), format_timestamp(d)]);
        self
    }

    /// `-t` before the first input: read at most this much of the input.
    pub fn limit_duration(mut self, d: Duration) -> Self {
        self.state.push_pre_read(["-t".to_string(), format_timestamp(d)]);
        self
    }

    /// Add the first input.
    pub fn input(mut self, path: impl Into<String>) -> Read {
        self.state.push_input(path);
        Read { state: self.state }
    }
}

/// Input stage. Seek and duration options attach to the most recent input.
#[derive(Debug, Clone)]
pub struct Read {
    state: BuilderState,
}

impl Read {
    /// Pass an argument through verbatim, immediately before the most
    /// recent input's `-i`.
    pub fn raw(mut self, arg: impl Into<String>) -> Self {
        self.state.push_input_option([arg]);
        self
    }

    /// `-ss` on the most recent input.
    pub fn seek(mut self, d: Duration) -> Self {
        self.state
            .push_input_option(["-ss".to_string(), format_timestamp(d)]);
        self
    }

    /// `-to` on the most recent input.
    pub fn end_at(mut self, d: Duration) -> Self {
        self.state
            .push_input_option(["-to".to_string(), format_timestamp(d)]);
        self
    }

    /// `-t` on the most recent input.
    pub fn limit_duration(mut self, d: Duration) -> Self {
        self.state
            .push_input_option(["-t".to_string(), format_timestamp(d)]);
        self
    }

    /// Add another input.
    pub fn input(mut self, path: impl Into<String>) -> Self {
        self.state.push_input(path);
        self
    }

    /// Start the filter graph.
    pub fn filter(self) -> FilterStage {
        FilterStage { state: self.state }
    }

    /// Skip filtering and move on to output options.
    pub fn output(mut self, path: impl Into<String>) -> Write {
        self.state.output = path.into();
        Write { state: self.state }
    }
}

/// Choose between a simple (`-vf`/`-af`) and a complex filter graph.
#[derive(Debug, Clone)]
pub struct FilterStage {
    state: BuilderState,
}

impl FilterStage {
    pub fn simple(mut self, kind: SimpleFilterKind) -> SimpleFilters {
        self.state.simple_kind = kind;
        SimpleFilters { state: self.state }
    }

    pub fn complex(self) -> ComplexFilters {
        ComplexFilters { state: self.state }
    }
}

/// A linear filter chain applied to the single video or audio stream.
#[derive(Debug, Clone)]
pub struct SimpleFilters {
    state: BuilderState,
}

impl SimpleFilters {
    pub fn add(mut self, filter: AtomicFilter) -> Self {
        self.state.filters.push(FilterNode::Atomic(filter));
        self
    }

    pub fn done(self) -> Write {
        Write { state: self.state }
    }
}

/// A filter graph of labelled chains.
#[derive(Debug, Clone)]
pub struct ComplexFilters {
    state: BuilderState,
}

impl ComplexFilters {
    /// Add a single-filter chain `[inputs…]filter[outputs…]`.
    pub fn chain<I, O, S, T>(self, inputs: I, filter: AtomicFilter, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.push(Chain::new(inputs, filter, outputs))
    }

    /// Add a pre-built chain, e.g. one with several filters.
    pub fn push(mut self, chain: Chain) -> Self {
        self.state.filters.push(FilterNode::Chain(chain));
        self
    }

    pub fn done(self) -> Write {
        Write { state: self.state }
    }
}

/// Output stage: everything after the inputs and the filter graph.
#[derive(Debug, Clone)]
pub struct Write {
    state: BuilderState,
}

impl Write {
    /// Pass an argument through verbatim, after the inputs.
    pub fn raw(mut self, arg: impl Into<String>) -> Self {
        self.state.push_write([arg]);
        self
    }

    /// `-ss` on the output: accurate (decode-and-discard) seek.
    pub fn seek(mut self, d: Duration) -> Self {
        self.state.push_write(["-ss".to_string(), format_timestamp(d)]);
        self
    }

    /// `-to` on the output: stop writing at this timestamp.
    pub fn end_at(mut self, d: Duration) -> Self {
        self.state.push_write(["-to".to_string(), format_timestamp(d)]);
        self
    }

    /// `-t` on the output: limit the output duration.
    pub fn limit_duration(mut self, d: Duration) -> Self {
        self.state.push_write(["-t".to_string(), format_timestamp(d)]);
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.state.push_write(["-c:v".to_string(), codec.into()]);
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.state.push_write(["-c:a".to_string(), codec.into()]);
        self
    }

    pub fn subtitle_codec(mut self, codec: impl Into<String>) -> Self {
        self.state.push_write(["-c:s".to_string(), codec.into()]);
        self
    }

    /// `-c:<stream>:<index> <codec>` for one specific output stream.
    pub fn codec_for(mut self, stream: StreamType, index: usize, codec: impl Into<String>) -> Self {
        self.state.push_write([
            format!("-c:{}:{index}", stream.specifier()),
            codec.into(),
        ]);
        self
    }

    /// Copy video packets without re-encoding.
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio packets without re-encoding.
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Constant rate factor for quality-targeted video encoders.
    pub fn crf(mut self, value: u32) -> Self {
        self.state.push_write(["-crf".to_string(), value.to_string()]);
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.state.push_write(["-preset".to_string(), preset.into()]);
        self
    }

    /// `-b:v`, e.g. `"5M"`.
    pub fn video_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.state.push_write(["-b:v".to_string(), bitrate.into()]);
        self
    }

    /// `-b:a`, e.g. `"192k"`.
    pub fn audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.state.push_write(["-b:a".to_string(), bitrate.into()]);
        self
    }

    /// Force the output container format (`-f`).
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.state.push_write(["-f".to_string(), format.into()]);
        self
    }

    /// Map a filter-graph output pad: `-map [label]`.
    pub fn map(mut self, label: impl AsRef<str>) -> Self {
        self.state
            .push_write(["-map".to_string(), format!("[{}]", label.as_ref())]);
        self
    }

    /// Map an input stream by specifier, unbracketed: `-map 0:a:0`.
    pub fn map_stream(mut self, specifier: impl Into<String>) -> Self {
        self.state.push_write(["-map".to_string(), specifier.into()]);
        self
    }

    /// Set (or replace) the output path.
    pub fn output(mut self, path: impl Into<String>) -> Self {
        self.state.output = path.into();
        self
    }

    /// The argument vector without the binary name.
    pub fn args(&self) -> Vec<String> {
        command::assemble(&self.state)
    }

    /// The full command line, starting with `ffmpeg`. Does not mutate the
    /// builder; repeated calls return the same string.
    pub fn build(&self) -> String {
        command::render(&self.state)
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    /// Run to completion with inherited stdout/stderr.
    pub async fn run(&self, runner: &Runner, cancel: &CancellationToken) -> Result<()> {
        command::validate(&self.state)?;
        runner.run(&self.args(), cancel).await
    }

    /// Start the process with progress reporting and return immediately.
    pub fn run_with_progress(
        &self,
        runner: &Runner,
        cancel: CancellationToken,
    ) -> Result<ProgressStream> {
        command::validate(&self.state)?;
        runner.run_with_progress(&self.args(), cancel)
    }
}

impl fmt::Display for Write {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}
