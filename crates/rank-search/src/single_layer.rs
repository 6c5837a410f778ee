//! Seek loop for one retrieval layer.
//!
//! Walks the layer's doc-id ranges in order, drives the query executor,
//! honors the deletion map, materializes sub-docs when asked, and runs the
//! filter wrapper. Every in-range doc the executor emits costs one unit of
//! quota, whether or not it survives deletion and filtering.

use rank_index::{DeletionMapReader, IndexError, MainToSubIterator, QueryExecutor};
use rank_types::{
    AllocatorRef, DocId, DocIdRange, LayerMeta, MatchDoc, TimeoutTerminator, END_DOCID,
};

use crate::filter::FilterWrapper;

/// Everything one layer's seek loop needs, bundled.
pub struct SingleLayerSearcherParam<'a> {
    pub executor: &'a mut dyn QueryExecutor,
    pub layer_meta: &'a LayerMeta,
    pub quota: u32,
    pub filter: Option<&'a mut FilterWrapper>,
    pub deletion_map: Option<&'a DeletionMapReader>,
    pub allocator: AllocatorRef,
    pub terminator: Option<&'a TimeoutTerminator>,
    pub main_to_sub: Option<&'a MainToSubIterator>,
    pub sub_deletion_map: Option<&'a DeletionMapReader>,
    pub get_all_sub_doc: bool,
}

/// Per-layer seek statistics handed back to the multi-layer driver.
#[derive(Debug, Default, Clone)]
pub struct SingleLayerSeekResult {
    pub match_count: u32,
    pub seek_count: u32,
    pub left_quota: u32,
    pub seek_doc_count: u64,
    pub error: Option<IndexError>,
}

pub struct SingleLayerSearcher<'a> {
    executor: &'a mut dyn QueryExecutor,
    ranges: &'a [DocIdRange],
    range_idx: usize,
    next_id: DocId,
    quota_left: u32,
    seeked_count: u32,
    filter: Option<&'a mut FilterWrapper>,
    deletion_map: Option<&'a DeletionMapReader>,
    allocator: AllocatorRef,
    terminator: Option<&'a TimeoutTerminator>,
    main_to_sub: Option<&'a MainToSubIterator>,
    sub_deletion_map: Option<&'a DeletionMapReader>,
    get_all_sub_doc: bool,
}

impl<'a> SingleLayerSearcher<'a> {
    pub fn new(param: SingleLayerSearcherParam<'a>) -> Self {
        Self {
            executor: param.executor,
            ranges: &param.layer_meta.ranges,
            range_idx: 0,
            next_id: 0,
            quota_left: param.quota,
            seeked_count: 0,
            filter: param.filter,
            deletion_map: param.deletion_map,
            allocator: param.allocator,
            terminator: param.terminator,
            main_to_sub: param.main_to_sub,
            sub_deletion_map: param.sub_deletion_map,
            get_all_sub_doc: param.get_all_sub_doc,
        }
    }

    /// Next surviving doc, or `None` on exhaustion, spent quota, or a
    /// tripped timeout (the caller distinguishes via the terminator).
    pub fn seek(&mut self, need_sub_doc: bool) -> Result<Option<MatchDoc>, IndexError> {
        loop {
            if self.quota_left == 0 {
                return Ok(None);
            }
            let Some(range) = self.ranges.get(self.range_idx) else {
                return Ok(None);
            };
            if let Some(terminator) = self.terminator {
                if !terminator.step() {
                    return Ok(None);
                }
            }
            if self.next_id < range.begin {
                self.next_id = range.begin;
            }
            let doc = self.executor.seek(self.next_id)?;
            if doc == END_DOCID {
                return Ok(None);
            }
            if doc >= range.end {
                self.range_idx += 1;
                self.next_id = doc;
                continue;
            }

            self.next_id = doc + 1;
            self.quota_left -= 1;
            self.seeked_count += 1;

            if let Some(deletion) = self.deletion_map {
                if deletion.is_deleted(doc) {
                    continue;
                }
            }
            let match_doc = self.allocator.borrow_mut().allocate(doc);
            if need_sub_doc {
                self.fill_sub_docs(match_doc);
            }
            if let Some(filter) = &mut self.filter {
                let mut alloc = self.allocator.borrow_mut();
                if !filter.pass(&mut alloc, match_doc) {
                    alloc.deallocate(match_doc);
                    continue;
                }
            }
            return Ok(Some(match_doc));
        }
    }

    fn fill_sub_docs(&self, match_doc: MatchDoc) {
        let Some(main_to_sub) = self.main_to_sub else {
            return;
        };
        let (begin, end) = main_to_sub.sub_range(match_doc.doc_id());
        let mut subs = Vec::with_capacity((end - begin).max(0) as usize);
        for sub in begin..end {
            if !self.get_all_sub_doc {
                if let Some(deletion) = self.sub_deletion_map {
                    if deletion.is_deleted(sub) {
                        continue;
                    }
                }
            }
            subs.push(sub);
        }
        self.allocator.borrow_mut().set_sub_docs(match_doc, subs);
    }

    /// Docs emitted in range this layer (quota consumed).
    pub fn seeked_count(&self) -> u32 {
        self.seeked_count
    }

    pub fn left_quota(&self) -> u32 {
        self.quota_left
    }

    /// Leaf posting seeks the executor performed.
    pub fn seek_doc_count(&self) -> u64 {
        self.executor.seek_doc_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_index::{IndexPartition, PostingList, QueryExecutorCreator};
    use rank_types::{LayerMeta, MatchDocAllocator, QueryPlan};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn plan() -> QueryPlan {
        QueryPlan::Term {
            index: "title".into(),
            term: "rust".into(),
        }
    }

    fn drain(searcher: &mut SingleLayerSearcher<'_>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(doc) = searcher.seek(false).unwrap() {
            out.push(doc.doc_id());
        }
        out
    }

    #[test]
    fn walks_ranges_and_honors_quota() {
        let mut part = IndexPartition::new(100);
        part.add_posting("title", "rust", PostingList::new(vec![1, 5, 12, 20, 30, 40]));
        let reader = part.reader();
        let creator = QueryExecutorCreator::new(&reader);
        let mut executor = creator.create(&plan()).unwrap().unwrap();

        let layer = LayerMeta::new(
            vec![DocIdRange::new(0, 15), DocIdRange::new(25, 50)],
            3,
        );
        let alloc: AllocatorRef = Rc::new(RefCell::new(MatchDocAllocator::new()));
        let mut searcher = SingleLayerSearcher::new(SingleLayerSearcherParam {
            executor: executor.as_mut(),
            layer_meta: &layer,
            quota: layer.quota,
            filter: None,
            deletion_map: None,
            allocator: Rc::clone(&alloc),
            terminator: None,
            main_to_sub: None,
            sub_deletion_map: None,
            get_all_sub_doc: false,
        });

        // doc 20 is outside both ranges; quota of 3 cuts the walk short
        assert_eq!(drain(&mut searcher), vec![1, 5, 12]);
        assert_eq!(searcher.seeked_count(), 3);
        assert_eq!(searcher.left_quota(), 0);
    }

    #[test]
    fn deleted_docs_consume_quota_but_do_not_match() {
        let mut part = IndexPartition::new(50);
        part.add_posting("title", "rust", PostingList::new(vec![1, 2, 3]));
        part.delete_doc(2);
        let reader = part.reader();
        let deletion = reader.deletion_map_reader();
        let creator = QueryExecutorCreator::new(&reader);
        let mut executor = creator.create(&plan()).unwrap().unwrap();

        let layer = LayerMeta::whole(0, 50, 10);
        let alloc: AllocatorRef = Rc::new(RefCell::new(MatchDocAllocator::new()));
        let mut searcher = SingleLayerSearcher::new(SingleLayerSearcherParam {
            executor: executor.as_mut(),
            layer_meta: &layer,
            quota: layer.quota,
            filter: None,
            deletion_map: Some(&deletion),
            allocator: Rc::clone(&alloc),
            terminator: None,
            main_to_sub: None,
            sub_deletion_map: None,
            get_all_sub_doc: false,
        });

        assert_eq!(drain(&mut searcher), vec![1, 3]);
        assert_eq!(searcher.seeked_count(), 3);
        assert_eq!(alloc.borrow().live_count(), 2);
    }

    #[test]
    fn sub_docs_materialize_for_survivors() {
        let mut part = IndexPartition::new(3);
        part.add_posting("title", "rust", PostingList::new(vec![0, 2]));
        part.push_sub_docs(2); // main 0 -> [0, 2)
        part.push_sub_docs(1); // main 1 -> [2, 3)
        part.push_sub_docs(2); // main 2 -> [3, 5)
        part.delete_sub_doc(3);
        let reader = part.reader();
        let main_to_sub = reader.main_to_sub_iter().unwrap();
        let sub_deletion = reader.sub_deletion_map_reader();
        let creator = QueryExecutorCreator::new(&reader);
        let mut executor = creator.create(&plan()).unwrap().unwrap();

        let layer = LayerMeta::whole(0, 3, 10);
        let mut raw_alloc = MatchDocAllocator::new();
        raw_alloc.enable_sub_doc_accessor();
        let alloc: AllocatorRef = Rc::new(RefCell::new(raw_alloc));
        let mut searcher = SingleLayerSearcher::new(SingleLayerSearcherParam {
            executor: executor.as_mut(),
            layer_meta: &layer,
            quota: layer.quota,
            filter: None,
            deletion_map: None,
            allocator: Rc::clone(&alloc),
            terminator: None,
            main_to_sub: Some(&main_to_sub),
            sub_deletion_map: Some(&sub_deletion),
            get_all_sub_doc: false,
        });

        let first = searcher.seek(true).unwrap().unwrap();
        assert_eq!(alloc.borrow().sub_docs(first), &[0, 1]);
        let second = searcher.seek(true).unwrap().unwrap();
        // sub doc 3 is deleted, only 4 survives
        assert_eq!(alloc.borrow().sub_docs(second), &[4]);
    }

    #[test]
    fn timeout_cuts_the_loop() {
        use std::time::{Duration, Instant};

        let mut part = IndexPartition::new(1000);
        part.add_posting("title", "rust", PostingList::new((0..500).collect()));
        let reader = part.reader();
        let creator = QueryExecutorCreator::new(&reader);
        let mut executor = creator.create(&plan()).unwrap().unwrap();

        let terminator =
            TimeoutTerminator::with_deadline(Instant::now() - Duration::from_secs(1));
        terminator.init(10);
        let layer = LayerMeta::whole(0, 1000, 1000);
        let alloc: AllocatorRef = Rc::new(RefCell::new(MatchDocAllocator::new()));
        let mut searcher = SingleLayerSearcher::new(SingleLayerSearcherParam {
            executor: executor.as_mut(),
            layer_meta: &layer,
            quota: layer.quota,
            filter: None,
            deletion_map: None,
            allocator: Rc::clone(&alloc),
            terminator: Some(&terminator),
            main_to_sub: None,
            sub_deletion_map: None,
            get_all_sub_doc: false,
        });

        let collected = drain(&mut searcher);
        assert!(terminator.is_timeout());
        // one check step's worth of seeks at most
        assert!(collected.len() < 10);
    }
}
