//! The mutable record every stage writes into.

use ffstage_core::{FilterNode, SimpleFilterKind};

/// Five ordered argument groups plus the bookkeeping the stages need.
///
/// Owned by exactly one stage value at a time; stage transitions move it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    /// Global options and options that must precede every input.
    pub pre_read: Vec<String>,
    /// `-i <path>` pairs, each preceded by its own per-input options.
    pub read: Vec<String>,
    pub filters: Vec<FilterNode>,
    /// Output options, in call order.
    pub write: Vec<String>,
    pub output: String,
    /// Flag used when `filters` renders with the simple syntax.
    pub simple_kind: SimpleFilterKind,
    /// Index in `read` of the most recent input's `-i` token.
    pub current_input: Option<usize>,
}

impl BuilderState {
    pub(crate) fn push_pre_read<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_read.extend(args.into_iter().map(Into::into));
    }

    pub(crate) fn push_write<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write.extend(args.into_iter().map(Into::into));
    }

    pub(crate) fn push_input(&mut self, path: impl Into<String>) {
        self.current_input = Some(self.read.len());
        self.read.push("-i".to_string());
        self.read.push(path.into());
    }

    /// Insert options immediately before the most recent input's `-i`,
    /// after any options already attached to that input.
    pub(crate) fn push_input_option<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(at) = self.current_input else {
            self.push_pre_read(args);
            return;
        };
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let n = args.len();
        self.read.splice(at..at, args);
        self.current_input = Some(at + n);
    }
}
