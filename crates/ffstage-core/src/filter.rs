//! Filter-graph model.
//!
//! A command accumulates a sequence of [`FilterNode`]s. Each node is either
//! an [`AtomicFilter`] (`scale=1280:-1`) or a [`Chain`] with labelled pads
//! (`[0:v]scale=1280:-1[main]`). A [`Pipeline`] is a view over the whole
//! sequence that decides, once for all nodes, whether ffmpeg needs the
//! simple (`-vf`/`-af`) or the complex (`-filter_complex`) syntax: ffmpeg
//! accepts only one graph syntax per invocation.

use std::fmt;

/// Which simple-filter flag to emit when no node needs a complex graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimpleFilterKind {
    /// `-vf`
    #[default]
    Video,
    /// `-af`
    Audio,
}

impl SimpleFilterKind {
    /// The ffmpeg flag for this kind.
    pub fn flag(self) -> &'static str {
        match self {
            SimpleFilterKind::Video => "-vf",
            SimpleFilterKind::Audio => "-af",
        }
    }
}

/// A single named filter with positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicFilter {
    name: String,
    params: Vec<String>,
}

impl AtomicFilter {
    /// A filter without parameters, e.g. `hflip`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// A filter with the given parameters, e.g. `scale` with `["1280", "-1"]`.
    pub fn with_params<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one parameter.
    pub fn param(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for AtomicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.params.join(":"))
        }
    }
}

/// One or more filters applied between explicitly labelled pads.
///
/// A chain always contains at least one filter: the only constructor takes
/// the first filter by value and [`Chain::then`] appends more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    inputs: Vec<String>,
    filters: Vec<AtomicFilter>,
    outputs: Vec<String>,
}

impl Chain {
    /// Build a chain `[inputs…]filter[outputs…]`.
    ///
    /// Labels are given without brackets. Either side may be empty, in which
    /// case ffmpeg connects the pad implicitly.
    pub fn new<I, O, S, T>(inputs: I, filter: AtomicFilter, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters: vec![filter],
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Append another filter to the chain, applied after the previous one.
    pub fn then(mut self, filter: AtomicFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn filters(&self) -> &[AtomicFilter] {
        &self.filters
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "[{label}]")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for label in &self.outputs {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

/// A node of the accumulated filter sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    Atomic(AtomicFilter),
    Chain(Chain),
}

impl FilterNode {
    /// Whether this node can only be expressed with `-filter_complex`.
    pub fn needs_complex(&self) -> bool {
        matches!(self, FilterNode::Chain(_))
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Atomic(a) => a.fmt(f),
            FilterNode::Chain(c) => c.fmt(f),
        }
    }
}

impl From<AtomicFilter> for FilterNode {
    fn from(filter: AtomicFilter) -> Self {
        FilterNode::Atomic(filter)
    }
}

impl From<Chain> for FilterNode {
    fn from(chain: Chain) -> Self {
        FilterNode::Chain(chain)
    }
}

/// A borrowed view over a whole filter sequence, built at assembly time.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    nodes: &'a [FilterNode],
}

impl<'a> Pipeline<'a> {
    pub fn new(nodes: &'a [FilterNode]) -> Self {
        Self { nodes }
    }

    /// True iff any node is a [`Chain`].
    pub fn needs_complex(&self) -> bool {
        self.nodes.iter().any(FilterNode::needs_complex)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flag and graph argument for this pipeline, or `None` when there
    /// is nothing to filter.
    pub fn args(&self, simple: SimpleFilterKind) -> Option<[String; 2]> {
        if self.is_empty() {
            return None;
        }
        let flag = if self.needs_complex() {
            "-filter_complex"
        } else {
            simple.flag()
        };
        Some([flag.to_string(), self.to_string()])
    }
}

impl fmt::Display for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.needs_complex() { ";" } else { "," };
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}
