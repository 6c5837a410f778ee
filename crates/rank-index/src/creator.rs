//! Builds query executors from compiled plans.
//!
//! This is the single site where index-layer failures surface during
//! session setup; the searcher maps the error into its accumulated
//! error-code channel without aborting the other layers.

use rank_types::{PkFilterClause, QueryPlan, END_DOCID};
use tracing::debug;

use crate::error::IndexError;
use crate::executor::{
    AndQueryExecutor, OrQueryExecutor, PkQueryExecutor, QueryExecutor, TermQueryExecutor,
};
use crate::reader::IndexPartitionReader;

pub struct QueryExecutorCreator<'a> {
    reader: &'a IndexPartitionReader,
}

impl<'a> QueryExecutorCreator<'a> {
    pub fn new(reader: &'a IndexPartitionReader) -> Self {
        Self { reader }
    }

    /// Build an executor for one plan. `Ok(None)` means the plan matches
    /// nothing in this partition (empty executors are discarded).
    pub fn create(&self, plan: &QueryPlan) -> Result<Option<Box<dyn QueryExecutor>>, IndexError> {
        match plan {
            QueryPlan::Term { index, term } => {
                let iter = self.reader.posting(index, term)?;
                Ok(iter.map(|it| Box::new(TermQueryExecutor::new(it)) as Box<dyn QueryExecutor>))
            }
            QueryPlan::And(subs) => {
                let mut children = Vec::with_capacity(subs.len());
                for sub in subs {
                    match self.create(sub)? {
                        Some(child) => children.push(child),
                        // one empty conjunct empties the whole conjunction
                        None => return Ok(None),
                    }
                }
                Ok(match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(Box::new(AndQueryExecutor::new(children))),
                })
            }
            QueryPlan::Or(subs) => {
                let mut children = Vec::with_capacity(subs.len());
                for sub in subs {
                    if let Some(child) = self.create(sub)? {
                        children.push(child);
                    }
                }
                Ok(match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(Box::new(OrQueryExecutor::new(children))),
                })
            }
        }
    }

    /// Build an executor, wrapping it in the primary-key pre-filter when
    /// the request carries one.
    pub fn create_with_pk(
        &self,
        plan: &QueryPlan,
        pk_filter: Option<&PkFilterClause>,
    ) -> Result<Option<Box<dyn QueryExecutor>>, IndexError> {
        let executor = self.create(plan)?;
        let Some(pk_clause) = pk_filter else {
            return Ok(executor);
        };
        let pk_doc = match self
            .reader
            .primary_key_reader()
            .lookup(&pk_clause.original_string)
        {
            Some(doc) => doc,
            None => {
                debug!(key = %pk_clause.original_string, "primary key not found");
                END_DOCID
            }
        };
        Ok(Some(Box::new(PkQueryExecutor::new(executor, pk_doc))))
    }
}
