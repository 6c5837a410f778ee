//! Multi-collector: several bounded collectors fed from one stream.
//!
//! Children are ordered; the first is canonical for `top`, the comparator,
//! and the reported counts. Each scored batch cascades: docs the first
//! child rejects or evicts are offered to the second, and so on. Only what
//! falls out of the last child goes back to the allocator, so every handle
//! keeps exactly one owner.

use rank_types::{AllocatorRef, MatchDoc, Reference, Score};

use crate::collector::{CollectorKind, HitCollector, Scorer};
use crate::comparator::ComboComparator;
use crate::nth_element::NthElementCollector;

pub struct MultiHitCollector {
    children: Vec<NthElementCollector>,
    alloc: AllocatorRef,
    scorer: Option<Box<dyn Scorer>>,
    score_ref: Option<Reference<Score>>,
    batch: Vec<MatchDoc>,
    batch_capacity: usize,
    collect_count: u32,
    expr_evaluated: bool,
}

impl MultiHitCollector {
    pub fn new(children: Vec<NthElementCollector>, batch_size: u32, alloc: AllocatorRef) -> Self {
        debug_assert!(!children.is_empty());
        let batch_capacity = batch_size.max(1) as usize;
        Self {
            children,
            alloc,
            scorer: None,
            score_ref: None,
            batch: Vec::with_capacity(batch_capacity),
            batch_capacity,
            collect_count: 0,
            expr_evaluated: false,
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>, score_ref: Reference<Score>) -> Self {
        self.scorer = Some(scorer);
        self.score_ref = Some(score_ref);
        self
    }

    pub fn children(&self) -> &[NthElementCollector] {
        &self.children
    }

    fn flush_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if let Some(scorer) = &mut self.scorer {
            let mut alloc = self.alloc.borrow_mut();
            scorer.score_batch(&mut alloc, &self.batch);
        }
        let mut docs = std::mem::take(&mut self.batch);
        let mut next = Vec::new();
        for child in &mut self.children {
            if docs.is_empty() {
                break;
            }
            child.collect_and_replace(&mut docs, &mut next);
            std::mem::swap(&mut docs, &mut next);
        }
        let mut alloc = self.alloc.borrow_mut();
        for doc in docs.drain(..) {
            alloc.deallocate(doc);
        }
        drop(alloc);
        self.batch = docs;
    }
}

impl HitCollector for MultiHitCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Multi
    }

    fn collect(&mut self, doc: MatchDoc, _need_flatten: bool) {
        self.collect_count += 1;
        self.batch.push(doc);
        if self.batch.len() >= self.batch_capacity {
            self.flush_batch();
        }
    }

    fn flush(&mut self) {
        self.flush_batch();
        let mut carry = Vec::new();
        let mut next = Vec::new();
        for i in 0..self.children.len() {
            if !carry.is_empty() {
                self.children[i].collect_and_replace(&mut carry, &mut next);
            }
            self.children[i].flush_buffer(&mut next);
            std::mem::swap(&mut carry, &mut next);
        }
        let mut alloc = self.alloc.borrow_mut();
        for doc in carry.drain(..) {
            alloc.deallocate(doc);
        }
    }

    fn top(&self) -> MatchDoc {
        self.children[0].top()
    }

    fn tops(&self) -> Vec<MatchDoc> {
        self.children.iter().map(HitCollector::top).collect()
    }

    fn steal_collect_count(&mut self) -> u32 {
        std::mem::take(&mut self.collect_count)
    }

    fn item_count(&self) -> u32 {
        self.children.iter().map(HitCollector::item_count).sum::<u32>() + self.batch.len() as u32
    }

    fn is_scored(&self) -> bool {
        self.score_ref.is_some()
    }

    fn comparator(&self) -> &ComboComparator {
        self.children[0].comparator()
    }

    fn allocator(&self) -> &AllocatorRef {
        &self.alloc
    }

    fn steal_all_match_docs(&mut self, out: &mut Vec<MatchDoc>) {
        for child in &mut self.children {
            child.steal_all_match_docs(out);
        }
    }

    fn update_expr_evaluated_status(&mut self) {
        self.expr_evaluated = true;
        for child in &mut self.children {
            child.update_expr_evaluated_status();
        }
    }
}

impl Drop for MultiHitCollector {
    fn drop(&mut self) {
        let mut alloc = self.alloc.borrow_mut();
        for doc in self.batch.drain(..) {
            alloc.deallocate(doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ReferenceComparator;
    use rank_types::{MatchDocAllocator, SortFlag};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        alloc: AllocatorRef,
        price_ref: Reference<Score>,
        rating_ref: Reference<Score>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut alloc = MatchDocAllocator::new();
            let price_ref = alloc.declare::<Score>("price").unwrap();
            let rating_ref = alloc.declare::<Score>("rating").unwrap();
            Self {
                alloc: Rc::new(RefCell::new(alloc)),
                price_ref,
                rating_ref,
            }
        }

        fn child(&self, reference: Reference<Score>, flag: SortFlag, k: u32) -> NthElementCollector {
            let cmp =
                ComboComparator::new().with(Box::new(ReferenceComparator::new(reference, flag)));
            NthElementCollector::new(k, 4, cmp, Rc::clone(&self.alloc))
        }

        fn doc(&self, doc_id: i32, price: Score, rating: Score) -> MatchDoc {
            let mut alloc = self.alloc.borrow_mut();
            let doc = alloc.allocate(doc_id);
            self.price_ref.set(&mut alloc, doc, price);
            self.rating_ref.set(&mut alloc, doc, rating);
            doc
        }
    }

    #[test]
    fn children_keep_their_own_top_k() {
        let fixture = Fixture::new();
        let cheap = fixture.child(fixture.price_ref, SortFlag::Ascending, 2);
        let best = fixture.child(fixture.rating_ref, SortFlag::Descending, 2);
        let mut multi = MultiHitCollector::new(vec![cheap, best], 4, Rc::clone(&fixture.alloc));

        for (i, (price, rating)) in [
            (10.0, 1.0),
            (50.0, 5.0),
            (20.0, 2.0),
            (5.0, 4.0),
            (80.0, 3.0),
            (30.0, 4.5),
        ]
        .into_iter()
        .enumerate()
        {
            multi.collect(fixture.doc(i as i32, price, rating), false);
        }
        multi.flush();

        // first child holds the two cheapest of everything it saw
        let alloc = fixture.alloc.borrow();
        let cheap_top = multi.children()[0].top();
        assert_eq!(fixture.price_ref.get(&alloc, cheap_top), 10.0);

        assert_eq!(multi.tops().len(), 2);
        assert_eq!(multi.kind(), CollectorKind::Multi);
    }

    #[test]
    fn no_handle_is_leaked_or_double_owned() {
        let fixture = Fixture::new();
        let a = fixture.child(fixture.price_ref, SortFlag::Ascending, 2);
        let b = fixture.child(fixture.rating_ref, SortFlag::Descending, 3);
        let mut multi = MultiHitCollector::new(vec![a, b], 3, Rc::clone(&fixture.alloc));

        for i in 0..40 {
            multi.collect(fixture.doc(i, i as Score, (40 - i) as Score), false);
        }
        multi.flush();

        // 2 + 3 survivors, everything else back in the arena
        assert_eq!(fixture.alloc.borrow().live_count(), 5);
        let mut stolen = Vec::new();
        multi.steal_all_match_docs(&mut stolen);
        assert_eq!(stolen.len(), 5);
        let unique: std::collections::HashSet<u32> = stolen.iter().map(|d| d.slot()).collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn canonical_child_drives_top_and_comparator() {
        let fixture = Fixture::new();
        let a = fixture.child(fixture.price_ref, SortFlag::Ascending, 1);
        let b = fixture.child(fixture.rating_ref, SortFlag::Descending, 1);
        let mut multi = MultiHitCollector::new(vec![a, b], 2, Rc::clone(&fixture.alloc));

        multi.collect(fixture.doc(0, 9.0, 1.0), false);
        multi.collect(fixture.doc(1, 3.0, 2.0), false);
        multi.flush();

        let alloc = fixture.alloc.borrow();
        assert_eq!(fixture.price_ref.get(&alloc, multi.top()), 3.0);
    }
}
