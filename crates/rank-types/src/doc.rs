//! Document identifiers and match-doc handles.

/// Document id inside one partition.
pub type DocId = i32;

/// Sentinel returned by posting iterators when the chain is exhausted.
pub const END_DOCID: DocId = DocId::MAX;

/// Opaque handle for one candidate document in the current session.
///
/// A `MatchDoc` is an index into the session arena plus the document id it
/// was allocated for. Handles are `Copy`; ownership is a protocol, not a
/// type: exactly one component holds a live handle at a time, and the
/// holder is responsible for returning it to the [`MatchDocAllocator`]
/// (or handing it on) when done.
///
/// [`MatchDocAllocator`]: crate::arena::MatchDocAllocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchDoc {
    slot: u32,
    doc_id: DocId,
}

/// Sentinel for "no document".
pub const INVALID_MATCHDOC: MatchDoc = MatchDoc {
    slot: u32::MAX,
    doc_id: -1,
};

impl MatchDoc {
    pub(crate) fn new(slot: u32, doc_id: DocId) -> Self {
        Self { slot, doc_id }
    }

    /// Arena slot backing this handle.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Document id this handle was allocated for.
    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn is_invalid(&self) -> bool {
        *self == INVALID_MATCHDOC
    }
}
