//! # rank-types
//!
//! Shared data model for the ranked top-K retrieval core.
//!
//! This crate defines the vocabulary every other crate speaks:
//! - [`MatchDoc`] handles backed by the session arena ([`MatchDocAllocator`])
//! - typed attribute access ([`Reference`], [`RawReference`], [`ValueKind`])
//! - retrieval layers ([`LayerMeta`]) and compiled request clauses
//! - the session error taxonomy ([`ErrorCode`], [`MultiErrorResult`])
//! - session tunables ([`SessionConfig`]) and the cooperative
//!   [`TimeoutTerminator`]

pub mod arena;
pub mod config;
pub mod doc;
pub mod error;
pub mod layer;
pub mod request;
pub mod timeout;
pub mod value;

pub use arena::{AllocatorRef, MatchDocAllocator, RawReference, Reference};
pub use config::SessionConfig;
pub use doc::{DocId, MatchDoc, END_DOCID, INVALID_MATCHDOC};
pub use error::{ErrorCode, ErrorEntry, ErrorResultRef, MultiErrorResult};
pub use layer::{DocIdRange, LayerMeta, LayerMetas};
pub use request::{
    AggregateClause, CmpOp, ConfigClause, FilterClause, PkFilterClause, QueryClause, QueryPlan,
    Request, SubDocDisplayType,
};
pub use timeout::TimeoutTerminator;
pub use value::{AttrValue, Score, SortFlag, ValueKind};
