//! Session arena for match-doc handles and their attribute slots.
//!
//! Handles are indices into a slot table owned by [`MatchDocAllocator`];
//! attribute values live in per-column storage indexed by the same slot.
//! Freed slots are recycled through a free list so a bounded collector can
//! churn through a long candidate stream without growing the arena.
//!
//! The allocator is single-owner, single-threaded state. Within a session
//! it is shared between the searcher, filter, and collector as an
//! [`AllocatorRef`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::doc::{DocId, MatchDoc};
use crate::for_value_kind;
use crate::value::{AttrValue, Score, ValueKind};

/// Shared handle to the session allocator.
pub type AllocatorRef = Rc<RefCell<MatchDocAllocator>>;

struct Column {
    kind: ValueKind,
    // Vec<T> with T::KIND == kind; pinned at declaration
    cells: Box<dyn Any>,
}

impl Column {
    fn new(kind: ValueKind, len: usize) -> Self {
        let cells: Box<dyn Any> =
            for_value_kind!(kind, T => Box::new(vec![T::default(); len]) as Box<dyn Any>);
        Self { kind, cells }
    }

    fn push_default(&mut self) {
        for_value_kind!(self.kind, T => {
            if let Some(v) = self.cells.downcast_mut::<Vec<T>>() {
                v.push(T::default());
            }
        });
    }
}

/// Typed handle into one attribute column.
pub struct Reference<T> {
    column: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Reference<T> {}

impl<T: AttrValue> Reference<T> {
    pub fn get(&self, alloc: &MatchDocAllocator, doc: MatchDoc) -> T {
        alloc.read(self.column, doc)
    }

    pub fn set(&self, alloc: &mut MatchDocAllocator, doc: MatchDoc, value: T) {
        alloc.write(self.column, doc, value);
    }

    /// Type-erased view of the same column.
    pub fn raw(&self) -> RawReference {
        RawReference {
            column: self.column,
            kind: T::KIND,
        }
    }
}

/// Type-erased handle into an attribute column.
///
/// Used where the element type is only known at runtime: score-floor
/// evaluation and join-key extraction both coerce through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReference {
    column: usize,
    kind: ValueKind,
}

impl RawReference {
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Read the slot value coerced into the score domain.
    ///
    /// An unknown or mismatched column type yields zero with a debug log.
    pub fn score(&self, alloc: &MatchDocAllocator, doc: MatchDoc) -> Score {
        for_value_kind!(self.kind, T => {
            match alloc.try_read::<T>(self.column, doc) {
                Some(v) => v.to_score(),
                None => {
                    debug!(kind = self.kind.as_str(), "score read from mismatched column");
                    0.0
                }
            }
        })
    }

    /// Read the slot value as stable hash-key bits.
    pub fn key_bits(&self, alloc: &MatchDocAllocator, doc: MatchDoc) -> Option<u64> {
        for_value_kind!(self.kind, T => {
            alloc.try_read::<T>(self.column, doc).map(AttrValue::key_bits)
        })
    }
}

/// Slot arena for one seek session.
#[derive(Default)]
pub struct MatchDocAllocator {
    doc_ids: Vec<DocId>,
    free: Vec<u32>,
    columns: Vec<Column>,
    names: HashMap<String, usize>,
    sub_docs: Option<Vec<Vec<DocId>>>,
    allocate_count: u64,
    deallocate_count: u64,
}

impl MatchDocAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn on per-slot sub-document storage. Must be called before any
    /// allocation when the request materializes sub-docs.
    pub fn enable_sub_doc_accessor(&mut self) {
        if self.sub_docs.is_none() {
            self.sub_docs = Some(vec![Vec::new(); self.doc_ids.len()]);
        }
    }

    pub fn has_sub_doc_accessor(&self) -> bool {
        self.sub_docs.is_some()
    }

    /// Declare (or look up) a typed attribute column.
    ///
    /// Returns `None` when the name is already bound to a different kind;
    /// callers treat that as a setup failure.
    pub fn declare<T: AttrValue>(&mut self, name: &str) -> Option<Reference<T>> {
        if let Some(&column) = self.names.get(name) {
            if self.columns[column].kind != T::KIND {
                debug!(
                    name,
                    declared = self.columns[column].kind.as_str(),
                    requested = T::KIND.as_str(),
                    "attribute kind conflict"
                );
                return None;
            }
            return Some(Reference {
                column,
                _marker: std::marker::PhantomData,
            });
        }
        let column = self.columns.len();
        self.columns.push(Column::new(T::KIND, self.doc_ids.len()));
        self.names.insert(name.to_string(), column);
        Some(Reference {
            column,
            _marker: std::marker::PhantomData,
        })
    }

    /// Look up a declared column without knowing its type.
    pub fn find(&self, name: &str) -> Option<RawReference> {
        self.names.get(name).map(|&column| RawReference {
            column,
            kind: self.columns[column].kind,
        })
    }

    pub fn allocate(&mut self, doc_id: DocId) -> MatchDoc {
        self.allocate_count += 1;
        if let Some(slot) = self.free.pop() {
            self.doc_ids[slot as usize] = doc_id;
            if let Some(subs) = &mut self.sub_docs {
                subs[slot as usize].clear();
            }
            return MatchDoc::new(slot, doc_id);
        }
        let slot = self.doc_ids.len() as u32;
        self.doc_ids.push(doc_id);
        for column in &mut self.columns {
            column.push_default();
        }
        if let Some(subs) = &mut self.sub_docs {
            subs.push(Vec::new());
        }
        MatchDoc::new(slot, doc_id)
    }

    pub fn deallocate(&mut self, doc: MatchDoc) {
        if doc.is_invalid() {
            return;
        }
        self.deallocate_count += 1;
        self.free.push(doc.slot());
    }

    /// Live handles: allocations not yet returned.
    pub fn live_count(&self) -> u64 {
        self.allocate_count - self.deallocate_count
    }

    pub fn allocate_count(&self) -> u64 {
        self.allocate_count
    }

    pub fn deallocate_count(&self) -> u64 {
        self.deallocate_count
    }

    pub fn set_sub_docs(&mut self, doc: MatchDoc, subs: Vec<DocId>) {
        if let Some(store) = &mut self.sub_docs {
            store[doc.slot() as usize] = subs;
        }
    }

    pub fn sub_docs(&self, doc: MatchDoc) -> &[DocId] {
        match &self.sub_docs {
            Some(store) if !doc.is_invalid() => &store[doc.slot() as usize],
            _ => &[],
        }
    }

    /// Reset at session end. Slots, counters, and sub-doc storage are
    /// dropped; declared columns survive so a follow-up session on the
    /// same request shape can reuse them.
    pub fn reset(&mut self) {
        self.doc_ids.clear();
        self.free.clear();
        self.allocate_count = 0;
        self.deallocate_count = 0;
        for column in &mut self.columns {
            let kind = column.kind;
            column.cells = Column::new(kind, 0).cells;
        }
        if let Some(subs) = &mut self.sub_docs {
            subs.clear();
        }
    }

    fn read<T: AttrValue>(&self, column: usize, doc: MatchDoc) -> T {
        self.try_read(column, doc).unwrap_or_else(|| {
            debug!(column, "typed read from mismatched column");
            T::default()
        })
    }

    fn try_read<T: AttrValue>(&self, column: usize, doc: MatchDoc) -> Option<T> {
        if doc.is_invalid() {
            return None;
        }
        self.columns
            .get(column)?
            .cells
            .downcast_ref::<Vec<T>>()?
            .get(doc.slot() as usize)
            .copied()
    }

    fn write<T: AttrValue>(&mut self, column: usize, doc: MatchDoc, value: T) {
        if doc.is_invalid() {
            return;
        }
        let slot = doc.slot() as usize;
        if let Some(col) = self.columns.get_mut(column) {
            if let Some(cells) = col.cells.downcast_mut::<Vec<T>>() {
                if slot < cells.len() {
                    cells[slot] = value;
                }
            }
        }
    }
}
