//! ffstage-core: shared types for the ffstage workspace.
//!
//! This crate is the foundational dependency of `ffstage`, providing the
//! unified error type, configuration, timestamp formatting for ffmpeg
//! arguments, and the filter-graph model.

pub mod config;
pub mod error;
pub mod filter;
pub mod time;

// Re-export the most commonly used items at the crate root.
pub use config::{Config, DecodePolicy, ProgressConfig, ToolsConfig};
pub use error::{Error, Result};
pub use filter::{AtomicFilter, Chain, FilterNode, Pipeline, SimpleFilterKind};
pub use time::{format_timestamp, parse_timestamp};
