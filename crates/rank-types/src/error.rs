//! Upward-visible error codes and the per-session accumulator.
//!
//! Seek-phase problems do not abort the session: they are appended here and
//! the caller decides what the partial result is worth. Only filter and
//! aggregator setup failures are fatal, and those make `init` fail with
//! the reason recorded here.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes reported to the query layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Timeout before any seek (executor construction phase).
    #[error("lookup_timeout")]
    LookupTimeout,

    /// Timeout during seek; partial results are valid.
    #[error("seekdoc_timeout")]
    SeekDocTimeout,

    /// File I/O failure surfaced by the index layer; partial results valid.
    #[error("index_io")]
    IndexIo,

    /// Query-executor construction failed for a layer.
    #[error("search_lookup")]
    SearchLookup,

    /// Query-executor construction hit an index I/O failure.
    #[error("search_lookup_fileio")]
    SearchLookupFileIo,

    /// Filter construction failed; session aborts.
    #[error("setup_filter")]
    SetupFilter,

    /// Aggregator construction failed; session aborts.
    #[error("setup_aggregator")]
    SetupAggregator,
}

/// One recorded error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub code: ErrorCode,
    pub message: String,
}

/// Accumulates error codes over one session.
#[derive(Debug, Default, Clone)]
pub struct MultiErrorResult {
    errors: Vec<ErrorEntry>,
}

impl MultiErrorResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.errors.push(ErrorEntry {
            code,
            message: message.into(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }
}

/// Shared error sink for one session.
pub type ErrorResultRef = Rc<RefCell<MultiErrorResult>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_in_order() {
        let mut result = MultiErrorResult::new();
        result.add_error(ErrorCode::SearchLookup, "layer 0");
        result.add_error(ErrorCode::SeekDocTimeout, "");
        assert_eq!(result.error_count(), 2);
        assert!(result.has_error(ErrorCode::SearchLookup));
        assert!(!result.has_error(ErrorCode::IndexIo));
        assert_eq!(result.errors()[0].message, "layer 0");
    }
}
