//! # rank-index
//!
//! Index-layer collaborator interfaces for the ranked retrieval core, plus
//! the in-memory partition used by tests and fixtures.
//!
//! The seek pipeline consumes exactly this surface: posting iterators with
//! `seek_doc` semantics, query executors built from compiled plans, the
//! primary-key pre-filter, deletion maps, and the main→sub mapping.

pub mod creator;
pub mod error;
pub mod executor;
pub mod posting;
pub mod reader;

pub use creator::QueryExecutorCreator;
pub use error::IndexError;
pub use executor::{
    AndQueryExecutor, OrQueryExecutor, PkQueryExecutor, QueryExecutor, TermQueryExecutor,
};
pub use posting::{PostingIterator, PostingList};
pub use reader::{
    DeletionMapReader, IndexPartition, IndexPartitionReader, MainToSubIterator, PrimaryKeyReader,
};
