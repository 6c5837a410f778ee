//! Bounded top-K collection with buffered partial selection.
//!
//! Keeping a heap current on every insert costs `log K` per doc. This
//! collector instead buffers up to `2K` candidates (plus one batch of head
//! room) and, when the buffer fills, runs a linear-time selection that
//! leaves the best `K` in front. Evicted handles are handed back so their
//! arena slots can be reused by the next batch.

use rank_types::{
    AllocatorRef, MatchDoc, MatchDocAllocator, Reference, Score, INVALID_MATCHDOC,
};
use tracing::debug;

use crate::collector::{CollectorKind, HitCollector, Scorer};
use crate::comparator::ComboComparator;

pub struct NthElementCollector {
    size: usize,
    max_buffer: usize,
    buffer: Vec<MatchDoc>,
    min_doc: MatchDoc,
    cmp: ComboComparator,
    alloc: AllocatorRef,
    scorer: Option<Box<dyn Scorer>>,
    score_ref: Option<Reference<Score>>,
    batch: Vec<MatchDoc>,
    batch_capacity: usize,
    collect_count: u32,
    replaced_scratch: Vec<MatchDoc>,
    expr_evaluated: bool,
}

impl NthElementCollector {
    /// `size` is K; `batch_size` is how many candidates buffer up before
    /// the scorer runs (and the head room kept past `2K`).
    pub fn new(size: u32, batch_size: u32, cmp: ComboComparator, alloc: AllocatorRef) -> Self {
        debug_assert!(size >= 1);
        let size = size as usize;
        let batch_capacity = batch_size.max(1) as usize;
        Self {
            size,
            max_buffer: size * 2,
            buffer: Vec::with_capacity(size * 2 + batch_capacity),
            min_doc: INVALID_MATCHDOC,
            cmp,
            alloc,
            scorer: None,
            score_ref: None,
            batch: Vec::with_capacity(batch_capacity),
            batch_capacity,
            collect_count: 0,
            replaced_scratch: Vec::new(),
            expr_evaluated: false,
        }
    }

    /// Attach the external rank scorer and the reference it writes.
    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>, score_ref: Reference<Score>) -> Self {
        self.scorer = Some(scorer);
        self.score_ref = Some(score_ref);
        self
    }

    pub fn score_ref(&self) -> Option<Reference<Score>> {
        self.score_ref
    }

    /// Bulk-import a pre-collected set. At most `2K` docs; the minimum is
    /// only established once at least K docs are held.
    pub fn quick_init(&mut self, docs: Vec<MatchDoc>) {
        debug_assert!(docs.len() <= self.max_buffer);
        debug_assert!(self.buffer.is_empty() && self.batch.is_empty());
        self.buffer = docs;
        if self.buffer.len() >= self.size {
            let alloc = self.alloc.borrow();
            self.min_doc = Self::find_min(&self.buffer, &self.cmp, &alloc);
        }
    }

    /// Fold a scored batch into the buffer.
    ///
    /// Input docs are drained; docs the collector rejects (already worse
    /// than the remembered minimum, or evicted by a selection pass) are
    /// pushed to `replaced` and belong to the caller again. Returns how
    /// many were pushed this call.
    pub fn collect_and_replace(
        &mut self,
        docs: &mut Vec<MatchDoc>,
        replaced: &mut Vec<MatchDoc>,
    ) -> u32 {
        let before = replaced.len();
        let alloc = self.alloc.borrow();
        for doc in docs.drain(..) {
            if !self.min_doc.is_invalid()
                && self.buffer.len() >= self.size
                && self.cmp.is_worse(&alloc, doc, self.min_doc)
            {
                replaced.push(doc);
                continue;
            }
            self.buffer.push(doc);
        }
        if self.buffer.len() >= self.max_buffer {
            Self::select_top(&mut self.buffer, &self.cmp, &alloc, self.size);
            self.min_doc = self.buffer[self.size - 1];
            replaced.extend(self.buffer.drain(self.size..));
        }
        (replaced.len() - before) as u32
    }

    /// Trim the buffer to the final top-K. Returns the eviction count;
    /// evicted handles go to `replaced`.
    pub fn flush_buffer(&mut self, replaced: &mut Vec<MatchDoc>) -> u32 {
        let alloc = self.alloc.borrow();
        if self.buffer.len() <= self.size {
            if self.min_doc.is_invalid() {
                self.min_doc = Self::find_min(&self.buffer, &self.cmp, &alloc);
            }
            return 0;
        }
        Self::select_top(&mut self.buffer, &self.cmp, &alloc, self.size);
        self.min_doc = self.buffer[self.size - 1];
        let count = (self.buffer.len() - self.size) as u32;
        replaced.extend(self.buffer.drain(self.size..));
        count
    }

    fn select_top(
        buffer: &mut [MatchDoc],
        cmp: &ComboComparator,
        alloc: &MatchDocAllocator,
        k: usize,
    ) {
        buffer.select_nth_unstable_by(k - 1, |a, b| cmp.compare(alloc, *a, *b));
    }

    fn find_min(
        buffer: &[MatchDoc],
        cmp: &ComboComparator,
        alloc: &MatchDocAllocator,
    ) -> MatchDoc {
        let mut iter = buffer.iter();
        let Some(&first) = iter.next() else {
            return INVALID_MATCHDOC;
        };
        let mut min = first;
        for &doc in iter {
            if cmp.is_worse(alloc, doc, min) {
                min = doc;
            }
        }
        min
    }

    fn flush_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if let Some(scorer) = &mut self.scorer {
            let mut alloc = self.alloc.borrow_mut();
            scorer.score_batch(&mut alloc, &self.batch);
        }
        let mut batch = std::mem::take(&mut self.batch);
        let mut replaced = std::mem::take(&mut self.replaced_scratch);
        self.collect_and_replace(&mut batch, &mut replaced);
        {
            let mut alloc = self.alloc.borrow_mut();
            for doc in replaced.drain(..) {
                alloc.deallocate(doc);
            }
        }
        self.batch = batch;
        self.replaced_scratch = replaced;
    }
}

impl HitCollector for NthElementCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Single
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
        let mut replaced = std::mem::take(&mut self.replaced_scratch);
        let evicted = self.flush_buffer(&mut replaced);
        if evicted > 0 {
            debug!(evicted, kept = self.buffer.len(), "final buffer trim");
        }
        {
            let mut alloc = self.alloc.borrow_mut();
            for doc in replaced.drain(..) {
                alloc.deallocate(doc);
            }
        }
        self.replaced_scratch = replaced;
    }

    fn top(&self) -> MatchDoc {
        self.min_doc
    }

    fn steal_collect_count(&mut self) -> u32 {
        std::mem::take(&mut self.collect_count)
    }

    fn item_count(&self) -> u32 {
        (self.buffer.len() + self.batch.len()) as u32
    }

    fn is_scored(&self) -> bool {
        self.score_ref.is_some()
    }

    fn comparator(&self) -> &ComboComparator {
        &self.cmp
    }

    fn allocator(&self) -> &AllocatorRef {
        &self.alloc
    }

    fn steal_all_match_docs(&mut self, out: &mut Vec<MatchDoc>) {
        debug_assert!(self.buffer.len() <= self.size && self.batch.is_empty());
        out.append(&mut self.buffer);
    }

    fn update_expr_evaluated_status(&mut self) {
        self.expr_evaluated = true;
    }
}

impl Drop for NthElementCollector {
    fn drop(&mut self) {
        let mut alloc = self.alloc.borrow_mut();
        for doc in self.batch.drain(..) {
            alloc.deallocate(doc);
        }
        for doc in self.buffer.drain(..) {
            alloc.deallocate(doc);
        }
    }
}
