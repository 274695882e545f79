//! Command assembly: turn a [`BuilderState`] into ffmpeg's argument vector.
//!
//! Groups are always emitted in the same order, regardless of the order in
//! which operations were called across stages:
//!
//! 1. pre-read (global and pre-input options)
//! 2. read (per-input options and `-i` pairs)
//! 3. filter graph (`-vf`/`-af`/`-filter_complex`), if any
//! 4. write (output options)
//! 5. the output path, when set

use ffstage_core::{Error, Pipeline, Result};

use crate::builder::BuilderState;

/// Name of the external binary, the first token of a rendered command.
pub const FFMPEG: &str = "ffmpeg";

/// Assemble the argument vector (without the binary name).
pub fn assemble(state: &BuilderState) -> Vec<String> {
    let mut args = Vec::with_capacity(
        state.pre_read.len() + state.read.len() + state.write.len() + 3,
    );
    args.extend(state.pre_read.iter().cloned());
    args.extend(state.read.iter().cloned());
    if let Some(graph) = Pipeline::new(&state.filters).args(state.simple_kind) {
        args.extend(graph);
    }
    args.extend(state.write.iter().cloned());
    if !state.output.is_empty() {
        args.push(state.output.clone());
    }
    args
}

/// Render the full command line, joined with single spaces.
pub fn render(state: &BuilderState) -> String {
    let mut line = String::from(FFMPEG);
    for arg in assemble(state) {
        line.push(' ');
        line.push_str(&arg);
    }
    line
}

/// Reject states that cannot be run. Only a missing output path can slip
/// through the stage types.
pub fn validate(state: &BuilderState) -> Result<()> {
    if state.output.is_empty() {
        return Err(Error::Contract("no output path set".into()));
    }
    Ok(())
}
