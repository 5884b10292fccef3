//! Source locations attached to tokens, parse nodes, errors and signals.

use std::fmt;
use std::sync::Arc;

/// A `(source, line, column)` triple.
///
/// Used only for diagnostics; two constructs that differ only in their
/// target behave identically at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Target {
    /// File name or stream id the text came from (`None` for inline text).
    pub source: Option<Arc<str>>,
    /// 1-based line number (0 when unknown).
    pub line: u32,
    /// 1-based column number (0 when unknown).
    pub column: u32,
}

impl Target {
    /// Location used for synthetic values that have no source text.
    pub const UNKNOWN: Target = Target { source: None, line: 0, column: 0 };

    pub fn new(source: Option<Arc<str>>, line: u32, column: u32) -> Self {
        Target { source, line, column }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "<unknown>");
        }
        match &self.source {
            Some(src) => write!(f, "{src}:{}:{}", self.line, self.column),
            None => write!(f, "line {}, column {}", self.line, self.column),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
