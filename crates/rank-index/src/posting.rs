//! In-memory posting lists and their seek iterators.
//!
//! A posting list is an ascending doc-id chain. The chain handed to a
//! session may be a truncated prefix of the full one (an index-build
//! optimizer cuts low-value tails); `main_chain_df` keeps the full
//! frequency so the searcher can tell the two apart.

use std::rc::Rc;

use rank_types::{DocId, END_DOCID};

use crate::error::IndexError;

/// Immutable posting chain shared by all iterators of one session.
#[derive(Debug)]
pub struct PostingList {
    doc_ids: Vec<DocId>,
    main_chain_df: u32,
    // test fault: the nth seek on any iterator over this list fails
    io_fail_after: Option<u32>,
}

impl PostingList {
    pub fn new(doc_ids: Vec<DocId>) -> Self {
        debug_assert!(doc_ids.windows(2).all(|w| w[0] < w[1]));
        let df = doc_ids.len() as u32;
        Self {
            doc_ids,
            main_chain_df: df,
            io_fail_after: None,
        }
    }

    /// A truncated chain: `main_chain_df` is the frequency of the full
    /// list this chain was cut from.
    pub fn truncated(doc_ids: Vec<DocId>, main_chain_df: u32) -> Self {
        let mut list = Self::new(doc_ids);
        list.main_chain_df = list.main_chain_df.max(main_chain_df);
        list
    }

    /// Make every iterator over this list fail with an I/O error on its
    /// `after + 1`-th seek. Test support for the partial-result paths.
    pub fn failing_after(mut self, after: u32) -> Self {
        self.io_fail_after = Some(after);
        self
    }

    pub fn df(&self) -> u32 {
        self.doc_ids.len() as u32
    }

    pub fn main_chain_df(&self) -> u32 {
        self.main_chain_df
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }
}

/// Forward-only seek cursor over one [`PostingList`].
#[derive(Debug)]
pub struct PostingIterator {
    list: Rc<PostingList>,
    cursor: usize,
    seeks: u32,
}

impl PostingIterator {
    pub fn new(list: Rc<PostingList>) -> Self {
        Self {
            list,
            cursor: 0,
            seeks: 0,
        }
    }

    /// First document `>= id`, or [`END_DOCID`] when the chain is done.
    pub fn seek_doc(&mut self, id: DocId) -> Result<DocId, IndexError> {
        if let Some(after) = self.list.io_fail_after {
            if self.seeks >= after {
                return Err(IndexError::Io("posting read failed".to_string()));
            }
        }
        self.seeks += 1;
        let docs = &self.list.doc_ids;
        while self.cursor < docs.len() && docs[self.cursor] < id {
            self.cursor += 1;
        }
        Ok(docs.get(self.cursor).copied().unwrap_or(END_DOCID))
    }

    pub fn df(&self) -> u32 {
        self.list.df()
    }

    pub fn main_chain_df(&self) -> u32 {
        self.list.main_chain_df()
    }
}
