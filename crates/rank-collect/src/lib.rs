//! # rank-collect
//!
//! Top-K hit collection for the ranked retrieval core.
//!
//! The seek pipeline pushes surviving match docs into a [`HitCollector`];
//! the collector keeps the best K under a [`ComboComparator`] (rank order
//! plus a stable doc-id tiebreaker) and recycles everything it evicts back
//! into the session arena. [`NthElementCollector`] is the workhorse:
//! buffered partial selection instead of per-insert heap maintenance.
//! [`MultiHitCollector`] cascades one stream through several bounded
//! collectors with distinct sort orders.

pub mod collector;
pub mod comparator;
pub mod multi;
pub mod nth_element;

pub use collector::{CollectorKind, FnScorer, HitCollector, Scorer};
pub use comparator::{
    ComboComparator, DocComparator, DocIdComparator, ReferenceComparator, SortExpression,
};
pub use multi::MultiHitCollector;
pub use nth_element::NthElementCollector;
