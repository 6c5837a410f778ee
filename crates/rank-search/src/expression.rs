//! Attribute expressions: typed values per match doc.
//!
//! The expression framework proper lives upstream; the seek pipeline only
//! needs the narrow contract below: evaluate a value into the doc's arena
//! slot and expose the slot reference. The creator is backed by plain
//! doc-id-indexed columns, which is what the in-memory partition serves.

use std::collections::HashMap;
use std::rc::Rc;

use rank_collect::Scorer;
use rank_types::{AttrValue, MatchDoc, MatchDocAllocator, RawReference, Reference, Score};

/// One attribute bound to a match-doc slot.
pub trait AttributeExpression {
    /// Materialize the value for `doc` into its slot.
    fn evaluate(&self, alloc: &mut MatchDocAllocator, doc: MatchDoc);

    /// The slot this expression writes.
    fn reference(&self) -> RawReference;

    /// Rank phase is over; every surviving doc saw an evaluation. Lets
    /// lazy-materialization paths upstream skip a second pass.
    fn update_evaluated_status(&mut self) {}
}

struct ColumnExpression<T: AttrValue> {
    reference: Reference<T>,
    values: Rc<Vec<T>>,
}

impl<T: AttrValue> AttributeExpression for ColumnExpression<T> {
    fn evaluate(&self, alloc: &mut MatchDocAllocator, doc: MatchDoc) {
        let value = self
            .values
            .get(doc.doc_id().max(0) as usize)
            .copied()
            .unwrap_or_default();
        self.reference.set(alloc, doc, value);
    }

    fn reference(&self) -> RawReference {
        self.reference.raw()
    }
}

trait TableEntry {
    fn create(
        &self,
        alloc: &mut MatchDocAllocator,
        name: &str,
    ) -> Option<Box<dyn AttributeExpression>>;
}

struct TypedTable<T: AttrValue> {
    values: Rc<Vec<T>>,
}

impl<T: AttrValue> TableEntry for TypedTable<T> {
    fn create(
        &self,
        alloc: &mut MatchDocAllocator,
        name: &str,
    ) -> Option<Box<dyn AttributeExpression>> {
        let reference = alloc.declare::<T>(name)?;
        Some(Box::new(ColumnExpression {
            reference,
            values: Rc::clone(&self.values),
        }))
    }
}

/// Creates expressions over the partition's attribute columns.
#[derive(Default)]
pub struct AttributeExpressionCreator {
    tables: HashMap<String, Box<dyn TableEntry>>,
}

impl AttributeExpressionCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_column<T: AttrValue>(&mut self, name: &str, values: Vec<T>) {
        self.tables.insert(
            name.to_string(),
            Box::new(TypedTable {
                values: Rc::new(values),
            }),
        );
    }

    /// `None` when the attribute is unknown or its slot kind conflicts
    /// with an earlier declaration; callers treat that as setup failure.
    pub fn create(
        &self,
        name: &str,
        alloc: &mut MatchDocAllocator,
    ) -> Option<Box<dyn AttributeExpression>> {
        self.tables.get(name)?.create(alloc, name)
    }
}

/// Scorer that ranks by one attribute expression: evaluates it per doc and
/// coerces the value into the collector's score slot.
pub struct ExpressionScorer {
    expr: Box<dyn AttributeExpression>,
    score_ref: Reference<Score>,
}

impl ExpressionScorer {
    pub fn new(expr: Box<dyn AttributeExpression>, score_ref: Reference<Score>) -> Self {
        Self { expr, score_ref }
    }
}

impl Scorer for ExpressionScorer {
    fn score_batch(&mut self, alloc: &mut MatchDocAllocator, docs: &[MatchDoc]) {
        for &doc in docs {
            self.expr.evaluate(alloc, doc);
            let score = self.expr.reference().score(alloc, doc);
            self.score_ref.set(alloc, doc, score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_expression_materializes_by_doc_id() {
        let mut creator = AttributeExpressionCreator::new();
        creator.register_column::<i32>("price", vec![10, 20, 30]);

        let mut alloc = MatchDocAllocator::new();
        let expr = creator.create("price", &mut alloc).unwrap();
        let doc = alloc.allocate(2);
        expr.evaluate(&mut alloc, doc);
        assert_eq!(expr.reference().score(&alloc, doc), 30.0);
    }

    #[test]
    fn unknown_attribute_fails_creation() {
        let creator = AttributeExpressionCreator::new();
        let mut alloc = MatchDocAllocator::new();
        assert!(creator.create("missing", &mut alloc).is_none());
    }

    #[test]
    fn out_of_table_doc_reads_default() {
        let mut creator = AttributeExpressionCreator::new();
        creator.register_column::<u16>("stock", vec![7]);
        let mut alloc = MatchDocAllocator::new();
        let expr = creator.create("stock", &mut alloc).unwrap();
        let doc = alloc.allocate(50);
        expr.evaluate(&mut alloc, doc);
        assert_eq!(expr.reference().score(&alloc, doc), 0.0);
    }

    #[test]
    fn expression_scorer_writes_score_slot() {
        let mut creator = AttributeExpressionCreator::new();
        creator.register_column::<f32>("boost", vec![1.5, 2.5]);
        let mut alloc = MatchDocAllocator::new();
        let score_ref = alloc.declare::<Score>("rank_score").unwrap();
        let expr = creator.create("boost", &mut alloc).unwrap();
        let mut scorer = ExpressionScorer::new(expr, score_ref);

        let docs = vec![alloc.allocate(0), alloc.allocate(1)];
        scorer.score_batch(&mut alloc, &docs);
        assert_eq!(score_ref.get(&alloc, docs[1]), 2.5);
    }
}
