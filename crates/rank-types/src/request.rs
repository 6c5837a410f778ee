//! Compiled request clauses consumed from the query parser.
//!
//! The parser itself is an upstream component; what arrives here is already
//! compiled. The clause set mirrors what the seek pipeline needs and
//! nothing more.

use serde::{Deserialize, Serialize};

use crate::value::Score;

/// One compiled retrieval plan. Leaves address an inverted index by term;
/// interior nodes intersect or union their children's posting chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryPlan {
    Term { index: String, term: String },
    And(Vec<QueryPlan>),
    Or(Vec<QueryPlan>),
}

/// The query clause carries one plan per layer. When there are fewer plans
/// than layers, the first plan is reused for the remaining layers.
#[derive(Debug, Clone, Default)]
pub struct QueryClause {
    pub plans: Vec<QueryPlan>,
}

impl QueryClause {
    pub fn new(plans: Vec<QueryPlan>) -> Self {
        Self { plans }
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn plan(&self, i: usize) -> Option<&QueryPlan> {
        self.plans.get(i)
    }
}

/// Comparison operator of a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn eval(&self, lhs: Score, rhs: Score) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

/// User filter: a comparison over one numeric attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub attr: String,
    pub op: CmpOp,
    pub value: Score,
}

/// Aggregate request: group survivors by one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateClause {
    pub group_key: String,
}

/// Primary-key pre-filter: restrict the whole request to one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkFilterClause {
    pub original_string: String,
}

/// How sub-documents are surfaced in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubDocDisplayType {
    #[default]
    No,
    Group,
    Flat,
}

/// Request-level flags the seek pipeline honors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigClause {
    /// Skip the deletion map entirely.
    #[serde(default)]
    pub ignore_delete: bool,

    #[serde(default)]
    pub sub_doc_display_type: SubDocDisplayType,

    /// Keep a main doc even when every sub-doc was filtered.
    #[serde(default)]
    pub get_all_sub_doc: bool,

    /// Upper bound on collected survivors across all layers.
    #[serde(default = "default_rank_size")]
    pub rank_size: u32,

    /// Top-K the collector keeps. Zero selects the unscored path:
    /// survivors feed the aggregator only.
    #[serde(default = "default_required_top_k")]
    pub required_top_k: u32,
}

fn default_rank_size() -> u32 {
    5000
}

fn default_required_top_k() -> u32 {
    10
}

impl Default for ConfigClause {
    fn default() -> Self {
        Self {
            ignore_delete: false,
            sub_doc_display_type: SubDocDisplayType::default(),
            get_all_sub_doc: false,
            rank_size: default_rank_size(),
            required_top_k: default_required_top_k(),
        }
    }
}

impl ConfigClause {
    pub fn needs_sub_doc(&self) -> bool {
        self.sub_doc_display_type != SubDocDisplayType::No
    }
}

/// One compiled request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub query: QueryClause,
    pub filter: Option<FilterClause>,
    pub aggregate: Option<AggregateClause>,
    pub pk_filter: Option<PkFilterClause>,
    pub config: ConfigClause,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_op_eval() {
        assert!(CmpOp::Le.eval(1.0, 1.0));
        assert!(CmpOp::Gt.eval(2.0, 1.0));
        assert!(!CmpOp::Ne.eval(3.0, 3.0));
    }

    #[test]
    fn config_clause_defaults() {
        let config = ConfigClause::default();
        assert!(!config.needs_sub_doc());
        assert_eq!(config.required_top_k, 10);
    }

    #[test]
    fn query_clause_indexing() {
        let clause = QueryClause::new(vec![QueryPlan::Term {
            index: "title".into(),
            term: "rust".into(),
        }]);
        assert_eq!(clause.plan_count(), 1);
        assert!(clause.plan(1).is_none());
    }
}
