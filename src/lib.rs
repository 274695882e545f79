//! # ffstage
//!
//! Staged ffmpeg command builder with typed progress monitoring.
//!
//! This crate provides:
//!
//! - **Staged builder** ([`builder`]) -- `BeforeRead → Read → Filter → Write`
//!   stage types that only expose the options legal at their position in
//!   ffmpeg's command line, so arguments can never be emitted out of order.
//! - **Command assembly** ([`command`]) -- renders the argument groups in
//!   their fixed order, with the simple/complex filter-graph decision taken
//!   once over the whole graph.
//! - **Process runner** ([`Runner`]) -- spawns ffmpeg with cancellation and
//!   deadline support.
//! - **Progress monitoring** ([`ProgressStream`]) -- decodes `-progress`
//!   records into [`Progress`] snapshots on a background task.
//!
//! ## Example
//!
//! ```
//! use ffstage::{ffmpeg, AtomicFilter};
//!
//! let cmd = ffmpeg()
//!     .input("video.mp4")
//!     .input("logo.png")
//!     .filter()
//!     .complex()
//!     .chain(["0:v"], AtomicFilter::with_params("scale", ["1280", "-1"]), ["main"])
//!     .chain(["1:v"], AtomicFilter::with_params("scale", ["400", "-1"]), ["logo"])
//!     .chain(["main", "logo"], AtomicFilter::with_params("overlay", ["W-w-10", "10"]), ["out"])
//!     .done()
//!     .map("out")
//!     .output("out.mp4")
//!     .video_codec("libx264")
//!     .crf(22);
//!
//! assert_eq!(
//!     cmd.build(),
//!     "ffmpeg -i video.mp4 -i logo.png \
//!      -filter_complex [0:v]scale=1280:-1[main];[1:v]scale=400:-1[logo];[main][logo]overlay=W-w-10:10[out] \
//!      -map [out] -c:v libx264 -crf 22 out.mp4"
//! );
//! ```

pub mod builder;
pub mod command;
pub mod progress;
pub mod runner;
pub mod tools;

// ---- Re-exports for convenience ----

pub use builder::{
    ffmpeg, BeforeRead, BuilderState, ComplexFilters, FilterStage, LogLevel, Read, SimpleFilters,
    StreamType, Write,
};
pub use ffstage_core::{
    format_timestamp, parse_timestamp, AtomicFilter, Chain, Config, DecodePolicy, Error,
    FilterNode, Pipeline, ProgressConfig, Result, SimpleFilterKind, ToolsConfig,
};
pub use progress::{Decoded, Progress, ProgressDecoder, ProgressStream, StreamEnd};
pub use runner::{Runner, PROGRESS_ARGS};
pub use tools::{check_ffmpeg, resolve_ffmpeg, ToolInfo};
