//! Retrieval layers: doc-id ranges plus a seek quota.

use crate::doc::DocId;

/// Half-open doc-id range `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocIdRange {
    pub begin: DocId,
    pub end: DocId,
}

impl DocIdRange {
    pub fn new(begin: DocId, end: DocId) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> u64 {
        (self.end - self.begin).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

/// One retrieval layer: an ordered list of ranges and the maximum number of
/// documents the layer may emit after seek, before the filter runs.
#[derive(Debug, Clone)]
pub struct LayerMeta {
    pub ranges: Vec<DocIdRange>,
    pub quota: u32,
}

impl LayerMeta {
    pub fn new(ranges: Vec<DocIdRange>, quota: u32) -> Self {
        Self { ranges, quota }
    }

    /// Single-range convenience constructor.
    pub fn whole(begin: DocId, end: DocId, quota: u32) -> Self {
        Self::new(vec![DocIdRange::new(begin, end)], quota)
    }

    /// Total number of doc ids covered by this layer.
    pub fn range_size(&self) -> u64 {
        self.ranges.iter().map(DocIdRange::len).sum()
    }
}

/// The 1..N layers of one request, searched in order.
pub type LayerMetas = Vec<LayerMeta>;
