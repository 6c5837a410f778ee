//! Index-layer errors.

use thiserror::Error;

/// Failures surfaced by the index layer.
///
/// Only [`IndexError::Io`] is survivable mid-seek: the session keeps what
/// it collected and records the code. Anything else during a seek is a bug
/// in the index layer and propagates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// File I/O failure from the posting storage.
    #[error("index file I/O: {0}")]
    Io(String),

    /// Plan addresses an index that does not exist in this partition.
    #[error("unknown index: {0}")]
    UnknownIndex(String),
}

impl IndexError {
    pub fn is_io(&self) -> bool {
        matches!(self, IndexError::Io(_))
    }
}
