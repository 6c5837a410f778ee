//! Query executors: lazy ascending doc-id streams over posting chains.

use rank_types::{DocId, END_DOCID};

use crate::error::IndexError;
use crate::posting::PostingIterator;

/// A compiled query plan bound to one layer's posting chains.
///
/// `seek(id)` yields the first matching document `>= id` and never goes
/// backwards; [`END_DOCID`] means exhausted. Frequencies expose how much of
/// the posting chain is active so the caller can detect truncated chains.
pub trait QueryExecutor {
    fn seek(&mut self, id: DocId) -> Result<DocId, IndexError>;

    /// Frequency of the active (possibly truncated) chain.
    fn current_df(&self) -> u32;

    /// Frequency of the full chain the active one was cut from.
    fn main_chain_df(&self) -> u32;

    fn is_empty(&self) -> bool;

    /// Leaf-level posting seeks performed so far.
    fn seek_doc_count(&self) -> u64;
}

/// Single-term executor over one posting iterator.
pub struct TermQueryExecutor {
    iter: PostingIterator,
    seeks: u64,
}

impl TermQueryExecutor {
    pub fn new(iter: PostingIterator) -> Self {
        Self { iter, seeks: 0 }
    }
}

impl QueryExecutor for TermQueryExecutor {
    fn seek(&mut self, id: DocId) -> Result<DocId, IndexError> {
        self.seeks += 1;
        self.iter.seek_doc(id)
    }

    fn current_df(&self) -> u32 {
        self.iter.df()
    }

    fn main_chain_df(&self) -> u32 {
        self.iter.main_chain_df()
    }

    fn is_empty(&self) -> bool {
        self.iter.df() == 0
    }

    fn seek_doc_count(&self) -> u64 {
        self.seeks
    }
}

/// Conjunction: leapfrog over all children.
pub struct AndQueryExecutor {
    children: Vec<Box<dyn QueryExecutor>>,
}

impl AndQueryExecutor {
    pub fn new(children: Vec<Box<dyn QueryExecutor>>) -> Self {
        debug_assert!(children.len() >= 2);
        Self { children }
    }
}

impl QueryExecutor for AndQueryExecutor {
    fn seek(&mut self, id: DocId) -> Result<DocId, IndexError> {
        let mut target = id;
        loop {
            let mut candidate = self.children[0].seek(target)?;
            if candidate == END_DOCID {
                return Ok(END_DOCID);
            }
            let mut agreed = true;
            for child in &mut self.children[1..] {
                let doc = child.seek(candidate)?;
                if doc == END_DOCID {
                    return Ok(END_DOCID);
                }
                if doc > candidate {
                    candidate = doc;
                    agreed = false;
                    break;
                }
            }
            if agreed {
                return Ok(candidate);
            }
            target = candidate;
        }
    }

    fn current_df(&self) -> u32 {
        self.children
            .iter()
            .map(|c| c.current_df())
            .min()
            .unwrap_or(0)
    }

    fn main_chain_df(&self) -> u32 {
        self.children
            .iter()
            .map(|c| c.main_chain_df())
            .min()
            .unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.children.iter().any(|c| c.is_empty())
    }

    fn seek_doc_count(&self) -> u64 {
        self.children.iter().map(|c| c.seek_doc_count()).sum()
    }
}

/// Disjunction: minimum over per-child cached candidates.
pub struct OrQueryExecutor {
    children: Vec<Box<dyn QueryExecutor>>,
    candidates: Vec<DocId>,
}

impl OrQueryExecutor {
    pub fn new(children: Vec<Box<dyn QueryExecutor>>) -> Self {
        debug_assert!(children.len() >= 2);
        let candidates = vec![-1; children.len()];
        Self {
            children,
            candidates,
        }
    }
}

impl QueryExecutor for OrQueryExecutor {
    fn seek(&mut self, id: DocId) -> Result<DocId, IndexError> {
        let mut min = END_DOCID;
        for (candidate, child) in self.candidates.iter_mut().zip(&mut self.children) {
            if *candidate < id {
                *candidate = child.seek(id)?;
            }
            min = min.min(*candidate);
        }
        Ok(min)
    }

    fn current_df(&self) -> u32 {
        self.children.iter().map(|c| c.current_df()).sum()
    }

    fn main_chain_df(&self) -> u32 {
        self.children.iter().map(|c| c.main_chain_df()).sum()
    }

    fn is_empty(&self) -> bool {
        self.children.iter().all(|c| c.is_empty())
    }

    fn seek_doc_count(&self) -> u64 {
        self.children.iter().map(|c| c.seek_doc_count()).sum()
    }
}

/// Primary-key pre-filter: intersects the wrapped executor with one
/// looked-up document. A missing key makes the executor immediately
/// exhausted.
pub struct PkQueryExecutor {
    inner: Option<Box<dyn QueryExecutor>>,
    pk_doc: DocId,
}

impl PkQueryExecutor {
    pub fn new(inner: Option<Box<dyn QueryExecutor>>, pk_doc: DocId) -> Self {
        Self { inner, pk_doc }
    }
}

impl QueryExecutor for PkQueryExecutor {
    fn seek(&mut self, id: DocId) -> Result<DocId, IndexError> {
        if self.pk_doc == END_DOCID || id > self.pk_doc {
            return Ok(END_DOCID);
        }
        match &mut self.inner {
            None => Ok(self.pk_doc),
            Some(inner) => {
                let doc = inner.seek(self.pk_doc)?;
                if doc == self.pk_doc {
                    Ok(self.pk_doc)
                } else {
                    Ok(END_DOCID)
                }
            }
        }
    }

    fn current_df(&self) -> u32 {
        self.inner.as_ref().map_or(1, |i| i.current_df())
    }

    fn main_chain_df(&self) -> u32 {
        self.inner.as_ref().map_or(1, |i| i.main_chain_df())
    }

    fn is_empty(&self) -> bool {
        false
    }

    fn seek_doc_count(&self) -> u64 {
        self.inner.as_ref().map_or(0, |i| i.seek_doc_count())
    }
}
