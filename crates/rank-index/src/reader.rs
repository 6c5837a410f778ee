//! In-memory index partition and the reader views the core consumes.
//!
//! A real deployment backs these views with on-disk structures; the seek
//! pipeline only ever sees the narrow read-only surface below, taken as a
//! snapshot at session start and shareable across sessions.

use std::collections::HashMap;
use std::rc::Rc;

use rank_types::DocId;

use crate::error::IndexError;
use crate::posting::{PostingIterator, PostingList};

/// Read-only deletion bitmap.
#[derive(Debug, Clone)]
pub struct DeletionMapReader {
    deleted: Rc<Vec<bool>>,
}

impl DeletionMapReader {
    pub fn new(deleted: Rc<Vec<bool>>) -> Self {
        Self { deleted }
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        doc >= 0 && self.deleted.get(doc as usize).copied().unwrap_or(false)
    }
}

/// Main-doc to sub-doc mapping.
///
/// Stored as per-main end offsets into the sub-doc id space; main doc `d`
/// owns sub docs `[ends[d-1], ends[d])`.
#[derive(Debug, Clone)]
pub struct MainToSubIterator {
    ends: Rc<Vec<DocId>>,
}

impl MainToSubIterator {
    pub fn new(ends: Rc<Vec<DocId>>) -> Self {
        Self { ends }
    }

    pub fn sub_range(&self, main: DocId) -> (DocId, DocId) {
        if main < 0 || main as usize >= self.ends.len() {
            return (0, 0);
        }
        let end = self.ends[main as usize];
        let begin = if main == 0 {
            0
        } else {
            self.ends[main as usize - 1]
        };
        (begin, end)
    }
}

/// Primary-key lookup.
#[derive(Debug, Clone)]
pub struct PrimaryKeyReader {
    keys: Rc<HashMap<String, DocId>>,
}

impl PrimaryKeyReader {
    pub fn lookup(&self, key: &str) -> Option<DocId> {
        self.keys.get(key).copied()
    }
}

/// Mutable partition under construction. Tests and fixtures build one of
/// these, then freeze it into an [`IndexPartitionReader`].
#[derive(Debug, Default)]
pub struct IndexPartition {
    total_docs: DocId,
    indexes: HashMap<String, HashMap<String, Rc<PostingList>>>,
    io_failing_indexes: HashMap<String, String>,
    primary_keys: HashMap<String, DocId>,
    deleted: Vec<bool>,
    sub_deleted: Vec<bool>,
    main_to_sub_ends: Vec<DocId>,
    sub_count: DocId,
}

impl IndexPartition {
    pub fn new(total_docs: DocId) -> Self {
        Self {
            total_docs,
            deleted: vec![false; total_docs.max(0) as usize],
            ..Default::default()
        }
    }

    pub fn total_doc_count(&self) -> DocId {
        self.total_docs
    }

    pub fn add_posting(&mut self, index: &str, term: &str, list: PostingList) {
        self.indexes
            .entry(index.to_string())
            .or_default()
            .insert(term.to_string(), Rc::new(list));
    }

    /// Every lookup against `index` fails with an I/O error. Test support
    /// for the lookup-phase error paths.
    pub fn fail_lookup_with_io(&mut self, index: &str, message: &str) {
        self.io_failing_indexes
            .insert(index.to_string(), message.to_string());
    }

    pub fn set_primary_key(&mut self, key: &str, doc: DocId) {
        self.primary_keys.insert(key.to_string(), doc);
    }

    pub fn delete_doc(&mut self, doc: DocId) {
        if doc >= 0 && (doc as usize) < self.deleted.len() {
            self.deleted[doc as usize] = true;
        }
    }

    /// Append `count` sub-docs for the next main doc. Must be called once
    /// per main doc, in doc-id order, when sub-docs are modeled.
    pub fn push_sub_docs(&mut self, count: DocId) {
        self.sub_count += count.max(0);
        self.main_to_sub_ends.push(self.sub_count);
        self.sub_deleted
            .resize(self.sub_count.max(0) as usize, false);
    }

    pub fn delete_sub_doc(&mut self, sub: DocId) {
        if sub >= 0 && (sub as usize) < self.sub_deleted.len() {
            self.sub_deleted[sub as usize] = true;
        }
    }

    /// Freeze into the read-only snapshot the session consumes.
    pub fn reader(self) -> IndexPartitionReader {
        IndexPartitionReader {
            total_docs: self.total_docs,
            indexes: self.indexes,
            io_failing_indexes: self.io_failing_indexes,
            primary_keys: Rc::new(self.primary_keys),
            deleted: Rc::new(self.deleted),
            sub_deleted: Rc::new(self.sub_deleted),
            main_to_sub_ends: Rc::new(self.main_to_sub_ends),
        }
    }
}

/// Read-only partition snapshot.
#[derive(Debug, Clone)]
pub struct IndexPartitionReader {
    total_docs: DocId,
    indexes: HashMap<String, HashMap<String, Rc<PostingList>>>,
    io_failing_indexes: HashMap<String, String>,
    primary_keys: Rc<HashMap<String, DocId>>,
    deleted: Rc<Vec<bool>>,
    sub_deleted: Rc<Vec<bool>>,
    main_to_sub_ends: Rc<Vec<DocId>>,
}

impl IndexPartitionReader {
    pub fn total_doc_count(&self) -> DocId {
        self.total_docs
    }

    /// Open a posting iterator for `(index, term)`.
    ///
    /// An unknown term yields `Ok(None)` (empty chain); an unknown index is
    /// a plan/partition mismatch and errors.
    pub fn posting(&self, index: &str, term: &str) -> Result<Option<PostingIterator>, IndexError> {
        if let Some(message) = self.io_failing_indexes.get(index) {
            return Err(IndexError::Io(message.clone()));
        }
        let terms = self
            .indexes
            .get(index)
            .ok_or_else(|| IndexError::UnknownIndex(index.to_string()))?;
        Ok(terms
            .get(term)
            .filter(|list| !list.is_empty())
            .map(|list| PostingIterator::new(Rc::clone(list))))
    }

    pub fn primary_key_reader(&self) -> PrimaryKeyReader {
        PrimaryKeyReader {
            keys: Rc::clone(&self.primary_keys),
        }
    }

    pub fn deletion_map_reader(&self) -> DeletionMapReader {
        DeletionMapReader::new(Rc::clone(&self.deleted))
    }

    pub fn sub_deletion_map_reader(&self) -> DeletionMapReader {
        DeletionMapReader::new(Rc::clone(&self.sub_deleted))
    }

    pub fn main_to_sub_iter(&self) -> Option<MainToSubIterator> {
        if self.main_to_sub_ends.is_empty() {
            return None;
        }
        Some(MainToSubIterator::new(Rc::clone(&self.main_to_sub_ends)))
    }
}
