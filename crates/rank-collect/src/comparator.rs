//! Rank-order comparators.
//!
//! A comparator answers one question: of two live match docs, which ranks
//! better? `Ordering::Less` means the first argument ranks better. The
//! [`ComboComparator`] chains user comparators and always falls through to
//! a doc-id tiebreaker, so top-K selection over identical input is
//! identical across runs.

use std::cmp::Ordering;

use rank_types::{AttrValue, MatchDoc, MatchDocAllocator, RawReference, Reference, SortFlag};

/// Pairing of a sort attribute and its orientation; what the score floor
/// remembers a cut against.
#[derive(Debug, Clone, Copy)]
pub struct SortExpression {
    pub reference: RawReference,
    pub flag: SortFlag,
}

impl SortExpression {
    pub fn new(reference: RawReference, flag: SortFlag) -> Self {
        Self { reference, flag }
    }
}

/// Orders two live match docs. `Less` = first ranks better.
pub trait DocComparator {
    fn compare(&self, alloc: &MatchDocAllocator, a: MatchDoc, b: MatchDoc) -> Ordering;
}

/// Compares by one typed attribute column.
pub struct ReferenceComparator<T: AttrValue> {
    reference: Reference<T>,
    flag: SortFlag,
}

impl<T: AttrValue> ReferenceComparator<T> {
    pub fn new(reference: Reference<T>, flag: SortFlag) -> Self {
        Self { reference, flag }
    }
}

impl<T: AttrValue> DocComparator for ReferenceComparator<T> {
    fn compare(&self, alloc: &MatchDocAllocator, a: MatchDoc, b: MatchDoc) -> Ordering {
        let va = self.reference.get(alloc, a);
        let vb = self.reference.get(alloc, b);
        let natural = va.partial_cmp(&vb).unwrap_or(Ordering::Equal);
        match self.flag {
            SortFlag::Ascending => natural,
            SortFlag::Descending => natural.reverse(),
        }
    }
}

/// Stable tiebreaker: the smaller doc id ranks better.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocIdComparator;

impl DocComparator for DocIdComparator {
    fn compare(&self, _alloc: &MatchDocAllocator, a: MatchDoc, b: MatchDoc) -> Ordering {
        a.doc_id().cmp(&b.doc_id())
    }
}

/// User comparators chained in order, with the doc-id tiebreaker appended.
#[derive(Default)]
pub struct ComboComparator {
    comparators: Vec<Box<dyn DocComparator>>,
}

impl ComboComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, comparator: Box<dyn DocComparator>) {
        self.comparators.push(comparator);
    }

    pub fn with(mut self, comparator: Box<dyn DocComparator>) -> Self {
        self.add(comparator);
        self
    }

    pub fn compare(&self, alloc: &MatchDocAllocator, a: MatchDoc, b: MatchDoc) -> Ordering {
        for comparator in &self.comparators {
            let ord = comparator.compare(alloc, a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        DocIdComparator.compare(alloc, a, b)
    }

    /// Whether `a` ranks strictly after `b`.
    pub fn is_worse(&self, alloc: &MatchDocAllocator, a: MatchDoc, b: MatchDoc) -> bool {
        self.compare(alloc, a, b) == Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_types::Score;

    fn setup() -> (MatchDocAllocator, Reference<Score>, Vec<MatchDoc>) {
        let mut alloc = MatchDocAllocator::new();
        let score_ref = alloc.declare::<Score>("score").unwrap();
        let docs: Vec<MatchDoc> = (0..4).map(|d| alloc.allocate(d)).collect();
        for (doc, score) in docs.iter().zip([5.0, 1.0, 5.0, 8.0]) {
            score_ref.set(&mut alloc, *doc, score);
        }
        (alloc, score_ref, docs)
    }

    #[test]
    fn descending_prefers_larger_scores() {
        let (alloc, score_ref, docs) = setup();
        let cmp = ComboComparator::new().with(Box::new(ReferenceComparator::new(
            score_ref,
            SortFlag::Descending,
        )));
        assert_eq!(alloc.live_count(), 4);
        assert_eq!(cmp.compare(&alloc, docs[3], docs[0]), Ordering::Less);
        assert!(cmp.is_worse(&alloc, docs[1], docs[0]));
    }

    #[test]
    fn ties_break_on_doc_id() {
        let (alloc, score_ref, docs) = setup();
        let cmp = ComboComparator::new().with(Box::new(ReferenceComparator::new(
            score_ref,
            SortFlag::Descending,
        )));
        // docs 0 and 2 share score 5.0; smaller doc id ranks better
        assert_eq!(cmp.compare(&alloc, docs[0], docs[2]), Ordering::Less);
        assert!(cmp.is_worse(&alloc, docs[2], docs[0]));
    }

    #[test]
    fn empty_combo_orders_by_doc_id() {
        let (alloc, _, docs) = setup();
        let cmp = ComboComparator::new();
        assert_eq!(cmp.compare(&alloc, docs[0], docs[1]), Ordering::Less);
    }
}
