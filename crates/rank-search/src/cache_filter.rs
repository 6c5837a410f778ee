//! Cross-request score floor.
//!
//! A previous run for an equivalent query already knows where its top-K
//! cut landed; carrying that cut forward lets the next run drop candidates
//! that cannot possibly place. The floor is approximate (shard boundaries
//! shift, deletions accrue), so pruning is paired with a replenisher: when
//! the floor was too aggressive, the best of the pruned docs are pulled
//! back until the expected count is met.

use rank_collect::{HitCollector, SortExpression};
use rank_types::{MatchDoc, MatchDocAllocator, Score, SortFlag};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Remembered per-expression minimum scores, in sort-expression order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMinScoreFilter {
    scores: Vec<Score>,
}

impl CacheMinScoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scores(scores: Vec<Score>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    /// Record the collector's current cut, one score per first-level sort
    /// expression. Unscored sessions record the orientation's no-op floor.
    pub fn store_min_score(
        &mut self,
        collector: &dyn HitCollector,
        first_expressions: &[SortExpression],
    ) {
        let is_scored = collector.is_scored();
        let tops = collector.tops();
        let alloc = collector.allocator().borrow();
        for (i, expr) in first_expressions.iter().enumerate() {
            let top = tops.get(i).copied();
            let score = match top {
                Some(doc) if is_scored && !doc.is_invalid() => expr.reference.score(&alloc, doc),
                _ => Self::default_score_min(expr.flag),
            };
            self.scores.push(score);
        }
    }

    /// Partition `match_docs` against the floor, replenish from the
    /// rejects when fewer than `expect_count` survive, and release the
    /// rest. No-op for unscored collectors.
    pub fn filter_by_min_score(
        &self,
        collector: &dyn HitCollector,
        first_expressions: &[SortExpression],
        match_docs: &mut Vec<MatchDoc>,
        expect_count: usize,
    ) {
        if !collector.is_scored() {
            return;
        }

        let mut rejects = Vec::new();
        {
            let alloc = collector.allocator().borrow();
            match_docs.retain(|&doc| {
                if self.survives_floor(&alloc, doc, first_expressions) {
                    true
                } else {
                    rejects.push(doc);
                    false
                }
            });
        }
        debug!(
            surviving = match_docs.len(),
            rejected = rejects.len(),
            expect_count,
            "floor pre-prune"
        );
        if match_docs.len() < expect_count {
            self.select_extra_match_docs(
                collector,
                expect_count - match_docs.len(),
                &mut rejects,
                match_docs,
            );
        }

        let mut alloc = collector.allocator().borrow_mut();
        for doc in rejects.drain(..) {
            alloc.deallocate(doc);
        }
    }

    /// A doc survives when it is on the good side of the floor for at
    /// least one sort expression (ascending: `score <= floor`, descending:
    /// `score >= floor`, both inclusive).
    fn survives_floor(
        &self,
        alloc: &MatchDocAllocator,
        doc: MatchDoc,
        first_expressions: &[SortExpression],
    ) -> bool {
        for (i, expr) in first_expressions.iter().enumerate() {
            let score = expr.reference.score(alloc, doc);
            let floor = self.scores.get(i).copied().unwrap_or(0.0);
            let ok = if expr.flag.is_ascending() {
                score <= floor
            } else {
                score >= floor
            };
            if ok {
                return true;
            }
        }
        false
    }

    /// Pull the best `select_count` rejects back into the result set,
    /// ranked by the collector's comparator. Docs left in `rejects` were
    /// never selected and stay owned by the caller.
    fn select_extra_match_docs(
        &self,
        collector: &dyn HitCollector,
        select_count: usize,
        rejects: &mut Vec<MatchDoc>,
        match_docs: &mut Vec<MatchDoc>,
    ) {
        if select_count == 0 || rejects.is_empty() {
            return;
        }
        {
            let cmp = collector.comparator();
            let alloc = collector.allocator().borrow();
            if select_count < rejects.len() {
                rejects.select_nth_unstable_by(select_count - 1, |a, b| {
                    cmp.compare(&alloc, *a, *b)
                });
            }
        }
        let take = select_count.min(rejects.len());
        debug!(replenished = take, left = rejects.len() - take, "floor replenish");
        match_docs.extend(rejects.drain(..take));
    }

    /// The floor that admits everything for the given orientation.
    fn default_score_min(flag: SortFlag) -> Score {
        if flag.is_ascending() {
            Score::MAX
        } else {
            Score::MIN
        }
    }

    /// Encode the floor vector as a length-prefixed score sequence.
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.scores)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, bincode::Error> {
        Ok(Self {
            scores: bincode::deserialize(bytes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_collect::{
        ComboComparator, FnScorer, NthElementCollector, ReferenceComparator,
    };
    use rank_types::{AllocatorRef, MatchDocAllocator, Reference};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        alloc: AllocatorRef,
        score_ref: Reference<Score>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut alloc = MatchDocAllocator::new();
            let score_ref = alloc.declare::<Score>("rank_score").unwrap();
            Self {
                alloc: Rc::new(RefCell::new(alloc)),
                score_ref,
            }
        }

        fn scored_collector(&self, k: u32) -> NthElementCollector {
            let cmp = ComboComparator::new().with(Box::new(ReferenceComparator::new(
                self.score_ref,
                SortFlag::Descending,
            )));
            let score_ref = self.score_ref;
            NthElementCollector::new(k, 4, cmp, Rc::clone(&self.alloc)).with_scorer(
                Box::new(FnScorer::new(score_ref, move |alloc, doc| {
                    score_ref.get(alloc, doc)
                })),
                score_ref,
            )
        }

        fn docs(&self, scores: &[Score]) -> Vec<MatchDoc> {
            let mut alloc = self.alloc.borrow_mut();
            scores
                .iter()
                .enumerate()
                .map(|(i, &score)| {
                    let doc = alloc.allocate(i as i32);
                    self.score_ref.set(&mut alloc, doc, score);
                    doc
                })
                .collect()
        }

        fn scores_of(&self, docs: &[MatchDoc]) -> Vec<Score> {
            let alloc = self.alloc.borrow();
            docs.iter().map(|d| self.score_ref.get(&alloc, *d)).collect()
        }

        fn sort_exprs(&self, flag: SortFlag) -> Vec<SortExpression> {
            vec![SortExpression::new(self.score_ref.raw(), flag)]
        }
    }

    #[test]
    fn prunes_below_descending_floor_and_replenishes() {
        let fixture = Fixture::new();
        let collector = fixture.scored_collector(4);
        let filter = CacheMinScoreFilter::from_scores(vec![5.0]);
        let exprs = fixture.sort_exprs(SortFlag::Descending);

        let mut docs = fixture.docs(&[7.0, 3.0, 6.0, 4.0, 9.0, 2.0]);
        filter.filter_by_min_score(&collector, &exprs, &mut docs, 4);

        let mut scores = fixture.scores_of(&docs);
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap());
        // {7, 6, 9} beat the floor; the replenisher pulls back the best
        // reject (4) to reach the expected four
        assert_eq!(scores, vec![9.0, 7.0, 6.0, 4.0]);
        // never-selected rejects (3 and 2) went back to the arena
        assert_eq!(fixture.alloc.borrow().live_count(), 4);
    }

    #[test]
    fn no_replenish_when_floor_is_generous() {
        let fixture = Fixture::new();
        let collector = fixture.scored_collector(3);
        let filter = CacheMinScoreFilter::from_scores(vec![1.0]);
        let exprs = fixture.sort_exprs(SortFlag::Descending);

        let mut docs = fixture.docs(&[5.0, 2.0, 8.0]);
        filter.filter_by_min_score(&collector, &exprs, &mut docs, 3);
        assert_eq!(docs.len(), 3);
        assert_eq!(fixture.alloc.borrow().live_count(), 3);
    }

    #[test]
    fn ascending_floor_keeps_small_scores() {
        let fixture = Fixture::new();
        let collector = fixture.scored_collector(2);
        let filter = CacheMinScoreFilter::from_scores(vec![3.0]);
        let exprs = fixture.sort_exprs(SortFlag::Ascending);

        let mut docs = fixture.docs(&[1.0, 4.0, 3.0, 9.0]);
        filter.filter_by_min_score(&collector, &exprs, &mut docs, 2);
        let mut scores = fixture.scores_of(&docs);
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(scores, vec![1.0, 3.0]);
    }

    #[test]
    fn tighter_floor_survivors_are_subset_plus_replenished() {
        let fixture = Fixture::new();
        let collector = fixture.scored_collector(8);
        let exprs = fixture.sort_exprs(SortFlag::Descending);
        let input: Vec<Score> = vec![1.0, 9.0, 4.0, 6.0, 2.0, 8.0, 5.0, 7.0];

        let loose = CacheMinScoreFilter::from_scores(vec![4.0]);
        let mut docs_loose = fixture.docs(&input);
        loose.filter_by_min_score(&collector, &exprs, &mut docs_loose, 0);
        let survivors_loose: std::collections::BTreeSet<i32> =
            docs_loose.iter().map(|d| d.doc_id()).collect();

        let tight = CacheMinScoreFilter::from_scores(vec![6.0]);
        let mut docs_tight = fixture.docs(&input);
        tight.filter_by_min_score(&collector, &exprs, &mut docs_tight, 0);
        let survivors_tight: std::collections::BTreeSet<i32> =
            docs_tight.iter().map(|d| d.doc_id()).collect();

        assert!(survivors_tight.is_subset(&survivors_loose));
    }

    #[test]
    fn store_min_score_reads_collector_cut() {
        let fixture = Fixture::new();
        let mut collector = fixture.scored_collector(3);
        for doc in fixture.docs(&[5.0, 1.0, 4.0, 2.0, 8.0, 3.0]) {
            collector.collect(doc, false);
        }
        collector.flush();

        let mut filter = CacheMinScoreFilter::new();
        filter.store_min_score(&collector, &fixture.sort_exprs(SortFlag::Descending));
        assert_eq!(filter.scores(), &[4.0]);
    }

    #[test]
    fn unscored_collector_records_no_op_floor() {
        let fixture = Fixture::new();
        let cmp = ComboComparator::new().with(Box::new(ReferenceComparator::new(
            fixture.score_ref,
            SortFlag::Descending,
        )));
        let collector = NthElementCollector::new(3, 4, cmp, Rc::clone(&fixture.alloc));
        assert!(!collector.is_scored());

        let mut filter = CacheMinScoreFilter::new();
        filter.store_min_score(&collector, &fixture.sort_exprs(SortFlag::Descending));
        assert_eq!(filter.scores(), &[Score::MIN]);

        let mut ascending = CacheMinScoreFilter::new();
        ascending.store_min_score(&collector, &fixture.sort_exprs(SortFlag::Ascending));
        assert_eq!(ascending.scores(), &[Score::MAX]);

        // unscored filtering is a no-op
        let mut docs = fixture.docs(&[1.0, 2.0]);
        filter.filter_by_min_score(
            &collector,
            &fixture.sort_exprs(SortFlag::Descending),
            &mut docs,
            0,
        );
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn serialization_round_trip() {
        let filter = CacheMinScoreFilter::from_scores(vec![4.0, -1.5, 0.0]);
        let bytes = filter.serialize().unwrap();
        // length-prefixed sequence: u64 count then the raw scores
        assert_eq!(bytes.len(), 8 + 3 * 8);
        let restored = CacheMinScoreFilter::deserialize(&bytes).unwrap();
        assert_eq!(restored.scores(), filter.scores());
    }
}
