//! Aggregation sink for matched docs.
//!
//! The aggregator observes every matched doc before the collector decides
//! its fate; it never changes retrieval. The concrete implementation here
//! groups by one attribute and counts. Richer aggregation functions plug
//! in behind the same trait.

use std::collections::HashMap;

use rank_types::{AggregateClause, MatchDoc, MatchDocAllocator};
use tracing::warn;

use crate::expression::{AttributeExpression, AttributeExpressionCreator};

pub trait Aggregator {
    fn aggregate(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc);

    /// Docs aggregated so far.
    fn aggregate_count(&self) -> u32;

    fn update_expr_evaluated_status(&mut self) {}
}

/// Groups matched docs by one attribute's key bits and counts per group.
pub struct GroupCountAggregator {
    key_expr: Box<dyn AttributeExpression>,
    groups: HashMap<u64, u32>,
    count: u32,
}

impl GroupCountAggregator {
    pub fn new(key_expr: Box<dyn AttributeExpression>) -> Self {
        Self {
            key_expr,
            groups: HashMap::new(),
            count: 0,
        }
    }

    pub fn groups(&self) -> &HashMap<u64, u32> {
        &self.groups
    }
}

impl Aggregator for GroupCountAggregator {
    fn aggregate(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc) {
        self.key_expr.evaluate(alloc, doc);
        if let Some(key) = self.key_expr.reference().key_bits(alloc, doc) {
            *self.groups.entry(key).or_insert(0) += 1;
            self.count += 1;
        }
    }

    fn aggregate_count(&self) -> u32 {
        self.count
    }

    fn update_expr_evaluated_status(&mut self) {
        self.key_expr.update_evaluated_status();
    }
}

/// Builds the aggregator for a request's aggregate clause.
pub struct AggregatorCreator<'a> {
    expr_creator: &'a AttributeExpressionCreator,
}

impl<'a> AggregatorCreator<'a> {
    pub fn new(expr_creator: &'a AttributeExpressionCreator) -> Self {
        Self { expr_creator }
    }

    /// `None` when the group key cannot be resolved; the session treats
    /// that as a fatal setup failure.
    pub fn create(
        &self,
        clause: &AggregateClause,
        alloc: &mut MatchDocAllocator,
    ) -> Option<Box<dyn Aggregator>> {
        let Some(expr) = self.expr_creator.create(&clause.group_key, alloc) else {
            warn!(group_key = %clause.group_key, "aggregate key not resolvable");
            return None;
        };
        Some(Box::new(GroupCountAggregator::new(expr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_types::AttrValue;

    #[test]
    fn counts_per_group() {
        let mut expr_creator = AttributeExpressionCreator::new();
        expr_creator.register_column::<u32>("category", vec![1, 2, 1, 1]);
        let mut alloc = MatchDocAllocator::new();
        let creator = AggregatorCreator::new(&expr_creator);
        let clause = AggregateClause {
            group_key: "category".into(),
        };
        let mut aggregator = creator.create(&clause, &mut alloc).unwrap();

        for doc_id in [0, 1, 2, 3] {
            let doc = alloc.allocate(doc_id);
            aggregator.aggregate(&mut alloc, doc);
            alloc.deallocate(doc);
        }
        assert_eq!(aggregator.aggregate_count(), 4);
    }

    #[test]
    fn group_keys_distinguish_values() {
        let mut expr_creator = AttributeExpressionCreator::new();
        expr_creator.register_column::<u32>("category", vec![1, 2, 1]);
        let mut alloc = MatchDocAllocator::new();
        let expr = expr_creator.create("category", &mut alloc).unwrap();
        let mut aggregator = GroupCountAggregator::new(expr);

        for doc_id in [0, 1, 2] {
            let doc = alloc.allocate(doc_id);
            aggregator.aggregate(&mut alloc, doc);
        }
        assert_eq!(aggregator.groups().len(), 2);
        assert_eq!(aggregator.groups()[&1u32.key_bits()], 2);
    }

    #[test]
    fn unresolvable_key_fails_setup() {
        let expr_creator = AttributeExpressionCreator::new();
        let mut alloc = MatchDocAllocator::new();
        let creator = AggregatorCreator::new(&expr_creator);
        let clause = AggregateClause {
            group_key: "absent".into(),
        };
        assert!(creator.create(&clause, &mut alloc).is_none());
    }
}
