//! The tag-erased hit-collector surface the seek pipeline drives.

use rank_types::{AllocatorRef, MatchDoc, MatchDocAllocator, Reference, Score};

use crate::comparator::ComboComparator;

/// Collector variant tag. The core never downcasts; components that need
/// variant-specific behavior (the score floor) branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorKind {
    Single,
    Multi,
}

/// External rank scorer. Runs over a buffered batch of survivors and
/// writes each doc's rank score into the attached score reference.
pub trait Scorer {
    fn score_batch(&mut self, alloc: &mut MatchDocAllocator, docs: &[MatchDoc]);
}

/// Scorer backed by a plain function; enough for tests and for callers
/// whose scoring is a closed-form expression.
pub struct FnScorer<F> {
    score_ref: Reference<Score>,
    f: F,
}

impl<F> FnScorer<F>
where
    F: FnMut(&MatchDocAllocator, MatchDoc) -> Score,
{
    pub fn new(score_ref: Reference<Score>, f: F) -> Self {
        Self { score_ref, f }
    }
}

impl<F> Scorer for FnScorer<F>
where
    F: FnMut(&MatchDocAllocator, MatchDoc) -> Score,
{
    fn score_batch(&mut self, alloc: &mut MatchDocAllocator, docs: &[MatchDoc]) {
        for &doc in docs {
            let score = (self.f)(alloc, doc);
            self.score_ref.set(alloc, doc, score);
        }
    }
}

/// Bounded collector of ranked survivors.
///
/// Handles pushed through [`collect`](HitCollector::collect) transfer
/// ownership to the collector: evicted handles go back to the allocator,
/// kept ones stay until [`steal_all_match_docs`](HitCollector::steal_all_match_docs)
/// or drop.
pub trait HitCollector {
    fn kind(&self) -> CollectorKind;

    /// Accept one survivor. `need_flatten` marks docs whose sub-docs the
    /// result phase will expand into separate rows; the collector itself
    /// ranks the main doc only.
    fn collect(&mut self, doc: MatchDoc, need_flatten: bool);

    /// Score and fold any buffered candidates, then trim to the final
    /// top-K set. Idempotent.
    fn flush(&mut self);

    /// The worst doc currently guaranteed a place, once at least K docs
    /// are held; `INVALID_MATCHDOC` before that.
    fn top(&self) -> MatchDoc;

    /// One current-minimum doc per first-level sort expression: a single
    /// collector reports one, a multi collector one per child.
    fn tops(&self) -> Vec<MatchDoc> {
        vec![self.top()]
    }

    /// Docs accepted since the last steal. Resets the counter.
    fn steal_collect_count(&mut self) -> u32;

    /// Docs currently held.
    fn item_count(&self) -> u32;

    /// Whether a rank scorer is attached.
    fn is_scored(&self) -> bool;

    fn comparator(&self) -> &ComboComparator;

    fn allocator(&self) -> &AllocatorRef;

    /// Move all held handles out without releasing them. Only valid after
    /// `flush` (at most K held).
    fn steal_all_match_docs(&mut self, out: &mut Vec<MatchDoc>);

    /// Rank phase is over; attached expressions saw every survivor.
    fn update_expr_evaluated_status(&mut self);
}
