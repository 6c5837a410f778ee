//! Per-doc predicates between seek and collect.

use rank_types::{CmpOp, FilterClause, MatchDoc, MatchDocAllocator, Score};
use tracing::warn;

use crate::expression::{AttributeExpression, AttributeExpressionCreator};
use crate::join::JoinFilter;

/// A boolean predicate over one candidate doc.
pub trait Filter {
    fn pass(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc) -> bool;

    fn update_expr_evaluated_status(&mut self) {}
}

/// The compiled user filter: one attribute compared against a constant.
pub struct AttrFilter {
    expr: Box<dyn AttributeExpression>,
    op: CmpOp,
    value: Score,
}

impl AttrFilter {
    /// `None` when the filter attribute cannot be resolved; the session
    /// treats that as a fatal setup failure.
    pub fn create(
        clause: &FilterClause,
        expr_creator: &AttributeExpressionCreator,
        alloc: &mut MatchDocAllocator,
    ) -> Option<Self> {
        let Some(expr) = expr_creator.create(&clause.attr, alloc) else {
            warn!(attr = %clause.attr, "filter attribute not resolvable");
            return None;
        };
        Some(Self {
            expr,
            op: clause.op,
            value: clause.value,
        })
    }
}

impl Filter for AttrFilter {
    fn pass(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc) -> bool {
        self.expr.evaluate(alloc, doc);
        let lhs = self.expr.reference().score(alloc, doc);
        self.op.eval(lhs, self.value)
    }

    fn update_expr_evaluated_status(&mut self) {
        self.expr.update_evaluated_status();
    }
}

/// Rejects main docs whose materialized sub-doc set came up empty.
#[derive(Debug, Default)]
pub struct SubDocFilter;

impl SubDocFilter {
    pub fn pass(&self, alloc: &MatchDocAllocator, doc: MatchDoc) -> bool {
        !alloc.sub_docs(doc).is_empty()
    }
}

/// Composition of the user filter, the sub-doc filter, and the join
/// filter, evaluated in that order with short-circuit on first reject.
#[derive(Default)]
pub struct FilterWrapper {
    filter: Option<Box<dyn Filter>>,
    sub_doc_filter: Option<SubDocFilter>,
    join_filter: Option<JoinFilter>,
    filtered_count: u32,
}

impl FilterWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_filter(&mut self, filter: Box<dyn Filter>) {
        self.filter = Some(filter);
    }

    pub fn set_sub_doc_filter(&mut self, filter: SubDocFilter) {
        self.sub_doc_filter = Some(filter);
    }

    pub fn set_join_filter(&mut self, filter: JoinFilter) {
        self.join_filter = Some(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.sub_doc_filter.is_none() && self.join_filter.is_none()
    }

    pub fn join_filter(&self) -> Option<&JoinFilter> {
        self.join_filter.as_ref()
    }

    pub fn filter_mut(&mut self) -> Option<&mut dyn Filter> {
        match self.filter.as_mut() {
            Some(f) => Some(f.as_mut()),
            None => None,
        }
    }

    pub fn pass(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc) -> bool {
        let ok = self.eval(alloc, doc);
        if !ok {
            self.filtered_count += 1;
        }
        ok
    }

    fn eval(&mut self, alloc: &mut MatchDocAllocator, doc: MatchDoc) -> bool {
        if let Some(filter) = &mut self.filter {
            if !filter.pass(alloc, doc) {
                return false;
            }
        }
        if let Some(sub) = &self.sub_doc_filter {
            if !sub.pass(alloc, doc) {
                return false;
            }
        }
        if let Some(join) = &mut self.join_filter {
            if !join.pass(doc) {
                return false;
            }
        }
        true
    }

    pub fn filtered_count(&self) -> u32 {
        self.filtered_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{JoinDocIdConverter, JoinDocIdConverterCreator};

    fn creator_with_price() -> AttributeExpressionCreator {
        let mut creator = AttributeExpressionCreator::new();
        creator.register_column::<i32>("price", vec![5, 50, 500]);
        creator
    }

    #[test]
    fn attr_filter_compares_against_constant() {
        let creator = creator_with_price();
        let mut alloc = MatchDocAllocator::new();
        let clause = FilterClause {
            attr: "price".into(),
            op: CmpOp::Lt,
            value: 100.0,
        };
        let mut filter = AttrFilter::create(&clause, &creator, &mut alloc).unwrap();
        let cheap = alloc.allocate(0);
        let pricey = alloc.allocate(2);
        assert!(filter.pass(&mut alloc, cheap));
        assert!(!filter.pass(&mut alloc, pricey));
    }

    #[test]
    fn unknown_attr_fails_creation() {
        let creator = creator_with_price();
        let mut alloc = MatchDocAllocator::new();
        let clause = FilterClause {
            attr: "absent".into(),
            op: CmpOp::Eq,
            value: 0.0,
        };
        assert!(AttrFilter::create(&clause, &creator, &mut alloc).is_none());
    }

    #[test]
    fn wrapper_short_circuits_and_counts() {
        let creator = creator_with_price();
        let mut alloc = MatchDocAllocator::new();
        let clause = FilterClause {
            attr: "price".into(),
            op: CmpOp::Le,
            value: 50.0,
        };
        let attr = AttrFilter::create(&clause, &creator, &mut alloc).unwrap();

        let join_creator = JoinDocIdConverterCreator::new(vec![JoinDocIdConverter::new(
            vec![Some(0), None, Some(1)],
            true,
        )]);
        let mut wrapper = FilterWrapper::new();
        wrapper.set_filter(Box::new(attr));
        wrapper.set_join_filter(JoinFilter::new(&join_creator, false));

        let pass = alloc.allocate(0); // price ok, join mapped
        let join_miss = alloc.allocate(1); // price ok, join unmapped
        let price_miss = alloc.allocate(2); // price too high
        assert!(wrapper.pass(&mut alloc, pass));
        assert!(!wrapper.pass(&mut alloc, join_miss));
        assert!(!wrapper.pass(&mut alloc, price_miss));
        assert_eq!(wrapper.filtered_count(), 2);
        // price rejected before the join filter ever saw the doc
        assert_eq!(wrapper.join_filter().unwrap().filtered_count(), 1);
    }

    #[test]
    fn sub_doc_filter_requires_materialized_subs() {
        let mut alloc = MatchDocAllocator::new();
        alloc.enable_sub_doc_accessor();
        let filter = SubDocFilter;
        let with_subs = alloc.allocate(0);
        alloc.set_sub_docs(with_subs, vec![10, 11]);
        let without = alloc.allocate(1);
        assert!(filter.pass(&alloc, with_subs));
        assert!(!filter.pass(&alloc, without));
    }
}
