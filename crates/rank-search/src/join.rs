//! Join-side rejection.
//!
//! Two mechanisms share this module. [`JoinFilter`] rejects docs whose
//! doc-id converter cannot map them to the auxiliary table (strong-join
//! semantics). [`HashJoinInfo`] carries the right side of a hash join; the
//! joined seek flavors drop candidates whose join key is absent from it
//! before the collector ever sees them.

use std::collections::HashMap;
use std::rc::Rc;

use rank_types::{DocId, MatchDoc, MatchDocAllocator};

use crate::expression::AttributeExpression;

/// Requested join behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Missing mappings are tolerated; no filter installed.
    WeakJoin,
    /// Missing mappings reject the doc.
    StrongJoin,
    /// Install the filter only when a strong-join converter exists.
    #[default]
    Auto,
}

/// Maps main doc ids to their row in one auxiliary table.
#[derive(Debug, Clone)]
pub struct JoinDocIdConverter {
    aux_doc_ids: Rc<Vec<Option<DocId>>>,
    strong: bool,
}

impl JoinDocIdConverter {
    pub fn new(aux_doc_ids: Vec<Option<DocId>>, strong: bool) -> Self {
        Self {
            aux_doc_ids: Rc::new(aux_doc_ids),
            strong,
        }
    }

    pub fn convert(&self, doc: DocId) -> Option<DocId> {
        if doc < 0 {
            return None;
        }
        self.aux_doc_ids.get(doc as usize).copied().flatten()
    }

    pub fn is_strong(&self) -> bool {
        self.strong
    }
}

/// The converters one request resolved, in resolution order.
#[derive(Debug, Default, Clone)]
pub struct JoinDocIdConverterCreator {
    converters: Vec<JoinDocIdConverter>,
}

impl JoinDocIdConverterCreator {
    pub fn new(converters: Vec<JoinDocIdConverter>) -> Self {
        Self { converters }
    }

    pub fn has_strong_join_converter(&self) -> bool {
        self.converters.iter().any(JoinDocIdConverter::is_strong)
    }

    pub fn converters(&self) -> &[JoinDocIdConverter] {
        &self.converters
    }
}

/// Per-doc join-side predicate.
pub struct JoinFilter {
    converters: Vec<JoinDocIdConverter>,
    force_strong: bool,
    filtered_count: u32,
}

impl JoinFilter {
    pub fn new(creator: &JoinDocIdConverterCreator, force_strong: bool) -> Self {
        Self {
            converters: creator.converters().to_vec(),
            force_strong,
            filtered_count: 0,
        }
    }

    /// A doc passes when every applicable converter can map it.
    pub fn pass(&mut self, doc: MatchDoc) -> bool {
        for converter in &self.converters {
            if !(self.force_strong || converter.is_strong()) {
                continue;
            }
            if converter.convert(doc.doc_id()).is_none() {
                self.filtered_count += 1;
                return false;
            }
        }
        true
    }

    pub fn filtered_count(&self) -> u32 {
        self.filtered_count
    }
}

/// Right side of a hash join plus the expression producing the left key.
pub struct HashJoinInfo {
    join_attr_expr: Box<dyn AttributeExpression>,
    right_keys: HashMap<u64, Vec<u32>>,
}

impl HashJoinInfo {
    pub fn new(join_attr_expr: Box<dyn AttributeExpression>, right_keys: HashMap<u64, Vec<u32>>) -> Self {
        Self {
            join_attr_expr,
            right_keys,
        }
    }

    /// Whether the candidate's join key maps to any right-side row.
    /// Evaluates the join attribute into the doc's slot as a side effect.
    pub fn probe(&self, alloc: &mut MatchDocAllocator, doc: MatchDoc) -> bool {
        self.join_attr_expr.evaluate(alloc, doc);
        let Some(key) = self.join_attr_expr.reference().key_bits(alloc, doc) else {
            return false;
        };
        self.right_keys.contains_key(&key)
    }
}
