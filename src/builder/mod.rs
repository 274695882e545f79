//! Staged ffmpeg command builder.
//!
//! [`state`] holds the argument groups, [`stages`] the typed views that
//! write into them.

pub mod stages;
pub mod state;

pub use stages::{
    ffmpeg, BeforeRead, ComplexFilters, FilterStage, LogLevel, Read, SimpleFilters, StreamType,
    Write,
};
pub use state::BuilderState;
