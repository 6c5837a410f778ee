//! # rank-search
//!
//! The layered seek + evaluate + collect pipeline of the ranked retrieval
//! core.
//!
//! A seek session starts from a compiled [`Request`](rank_types::Request)
//! and a partition snapshot: [`RankSearcher`] builds one query executor
//! per retrieval layer, walks the layers under their quotas, filters
//! candidates through the [`FilterWrapper`], feeds survivors to the
//! optional [`Aggregator`] and the hit collector, and reports an estimated
//! total match count. [`CacheMinScoreFilter`] carries a previous run's
//! top-K cut into the next one as an opportunistic pre-filter with
//! replenishment.
//!
//! ## Modules
//!
//! - [`searcher`]: the multi-layer driver
//! - [`single_layer`]: per-layer seek loop
//! - [`filter`] / [`join`]: per-doc predicates and join-side rejection
//! - [`distributor`] / [`estimator`]: quota roll-over and match estimation
//! - [`cache_filter`]: remembered score floor
//! - [`expression`]: attribute expressions bound to match-doc slots
//! - [`aggregator`]: group statistics over matched docs
//! - [`metrics`]: per-session counters

pub mod aggregator;
pub mod cache_filter;
pub mod distributor;
pub mod estimator;
pub mod expression;
pub mod filter;
pub mod join;
pub mod metrics;
pub mod searcher;
pub mod single_layer;

pub use aggregator::{Aggregator, AggregatorCreator, GroupCountAggregator};
pub use cache_filter::CacheMinScoreFilter;
pub use distributor::LayerRangeDistributor;
pub use estimator::ResultEstimator;
pub use expression::{AttributeExpression, AttributeExpressionCreator, ExpressionScorer};
pub use filter::{AttrFilter, Filter, FilterWrapper, SubDocFilter};
pub use join::{
    HashJoinInfo, JoinDocIdConverter, JoinDocIdConverterCreator, JoinFilter, JoinType,
};
pub use metrics::SessionMetricsCollector;
pub use searcher::{RankSearcher, RankSearcherParam, RankSearcherResource};
pub use single_layer::{SingleLayerSearcher, SingleLayerSearcherParam, SingleLayerSeekResult};
