//! Multi-layer seek + evaluate + collect driver.
//!
//! One `RankSearcher` runs one seek session: it binds the request to the
//! partition snapshot, builds one query executor per layer, then walks the
//! layers in order, pushing filter survivors into the aggregator and the
//! hit collector. Executor-construction failures are accumulated per layer
//! and the session proceeds on the layers that built; filter or aggregator
//! setup failures abort the session. Mid-seek, only index I/O errors and
//! the cooperative timeout can stop the walk, and both leave the partial
//! result valid.

use std::rc::Rc;

use rank_collect::HitCollector;
use rank_index::{
    DeletionMapReader, IndexPartitionReader, MainToSubIterator, QueryExecutor,
    QueryExecutorCreator,
};
use rank_types::{
    AllocatorRef, ErrorCode, ErrorResultRef, FilterClause, LayerMetas, Request, SessionConfig,
    TimeoutTerminator,
};
use tracing::{debug, warn};

use crate::aggregator::{Aggregator, AggregatorCreator};
use crate::distributor::LayerRangeDistributor;
use crate::estimator::ResultEstimator;
use crate::expression::AttributeExpressionCreator;
use crate::filter::{AttrFilter, FilterWrapper, SubDocFilter};
use crate::join::{HashJoinInfo, JoinDocIdConverterCreator, JoinFilter, JoinType};
use crate::metrics::SessionMetricsCollector;
use crate::single_layer::{SingleLayerSearcher, SingleLayerSearcherParam, SingleLayerSeekResult};

/// Everything `init` binds for one session.
pub struct RankSearcherParam<'a> {
    pub request: &'a Request,
    pub reader: &'a IndexPartitionReader,
    pub expr_creator: &'a AttributeExpressionCreator,
    pub layer_metas: LayerMetas,
    pub allocator: AllocatorRef,
    pub terminator: Option<Rc<TimeoutTerminator>>,
    pub error_result: ErrorResultRef,
}

/// Per-search knobs and the metrics sink.
pub struct RankSearcherResource<'a> {
    pub metrics: &'a mut SessionMetricsCollector,
    pub required_top_k: u32,
    pub rank_size: u32,
    pub need_flatten: bool,
    pub get_all_sub_doc: bool,
}

pub struct RankSearcher {
    config: SessionConfig,
    layer_metas: LayerMetas,
    allocator: AllocatorRef,
    terminator: Option<Rc<TimeoutTerminator>>,
    error_result: ErrorResultRef,
    executors: Vec<Option<Box<dyn QueryExecutor>>>,
    filter: Option<FilterWrapper>,
    aggregator: Option<Box<dyn Aggregator>>,
    deletion_map: Option<DeletionMapReader>,
    sub_deletion_map: Option<DeletionMapReader>,
    main_to_sub: Option<MainToSubIterator>,
    match_count: u32,
}

impl RankSearcher {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            layer_metas: Vec::new(),
            allocator: AllocatorRef::default(),
            terminator: None,
            error_result: ErrorResultRef::default(),
            executors: Vec::new(),
            filter: None,
            aggregator: None,
            deletion_map: None,
            sub_deletion_map: None,
            main_to_sub: None,
            match_count: 0,
        }
    }

    /// Bind the session. Returns `false` when no layer executor could be
    /// built, or when filter/aggregator setup failed; the reason is in the
    /// error result either way.
    pub fn init(&mut self, param: RankSearcherParam<'_>) -> bool {
        let request = param.request;
        self.layer_metas = param.layer_metas;
        self.allocator = param.allocator;
        self.terminator = param.terminator;
        self.error_result = param.error_result;

        let ignore_delete = request.config.ignore_delete;
        if !ignore_delete {
            self.deletion_map = Some(param.reader.deletion_map_reader());
        }
        if request.config.needs_sub_doc() {
            self.main_to_sub = param.reader.main_to_sub_iter();
            if !ignore_delete {
                self.sub_deletion_map = Some(param.reader.sub_deletion_map_reader());
            }
            self.allocator.borrow_mut().enable_sub_doc_accessor();
        }

        if !self.init_query_executors(request, param.reader) {
            return false;
        }
        if !self.create_filter_wrapper(request.filter.as_ref(), param.expr_creator) {
            self.error_result
                .borrow_mut()
                .add_error(ErrorCode::SetupFilter, "create filter failed");
            return false;
        }
        if let Some(agg_clause) = &request.aggregate {
            let creator = AggregatorCreator::new(param.expr_creator);
            let aggregator = {
                let mut alloc = self.allocator.borrow_mut();
                creator.create(agg_clause, &mut alloc)
            };
            match aggregator {
                Some(aggregator) => self.aggregator = Some(aggregator),
                None => {
                    self.error_result
                        .borrow_mut()
                        .add_error(ErrorCode::SetupAggregator, "create aggregator failed");
                    return false;
                }
            }
        }
        true
    }

    /// Install the join-side filter. No-op for weak joins; auto installs
    /// only when a strong-join converter was resolved.
    pub fn create_join_filter(
        &mut self,
        converter_creator: Option<&JoinDocIdConverterCreator>,
        join_type: JoinType,
    ) {
        let Some(creator) = converter_creator else {
            return;
        };
        if join_type == JoinType::WeakJoin {
            return;
        }
        let force_strong = join_type == JoinType::StrongJoin;
        if force_strong || creator.has_strong_join_converter() {
            self.filter
                .get_or_insert_with(FilterWrapper::new)
                .set_join_filter(JoinFilter::new(creator, force_strong));
        }
    }

    pub fn search(
        &mut self,
        resource: &mut RankSearcherResource<'_>,
        collector: &mut dyn HitCollector,
    ) -> u32 {
        self.search_multi_layers(resource, collector, None)
    }

    /// Like [`search`](Self::search), but each survivor must additionally
    /// carry a join key present on the hash-join right side.
    pub fn search_with_join(
        &mut self,
        resource: &mut RankSearcherResource<'_>,
        hash_join_info: &HashJoinInfo,
        collector: &mut dyn HitCollector,
    ) -> u32 {
        self.search_multi_layers(resource, collector, Some(hash_join_info))
    }

    /// Matches actually counted by the last search (not the estimate).
    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn filter(&self) -> Option<&FilterWrapper> {
        self.filter.as_ref()
    }

    pub fn aggregator(&self) -> Option<&dyn Aggregator> {
        self.aggregator.as_deref()
    }

    fn init_query_executors(&mut self, request: &Request, reader: &IndexPartitionReader) -> bool {
        let creator = QueryExecutorCreator::new(reader);
        let pk_filter = request.pk_filter.as_ref();
        let mut succ_once = false;
        self.executors.clear();
        // layers beyond the plan list reuse the first plan
        for layer in 0..self.layer_metas.len() {
            let plan = request.query.plan(layer).or_else(|| request.query.plan(0));
            let executor = plan.and_then(|plan| {
                match creator.create_with_pk(plan, pk_filter) {
                    Ok(executor) => executor,
                    Err(error) => {
                        warn!(layer, %error, "create query executor failed");
                        let code = if error.is_io() {
                            ErrorCode::SearchLookupFileIo
                        } else {
                            ErrorCode::SearchLookup
                        };
                        self.error_result
                            .borrow_mut()
                            .add_error(code, error.to_string());
                        None
                    }
                }
            });
            succ_once |= executor.is_some();
            self.executors.push(executor);
        }

        if let Some(terminator) = &self.terminator {
            if terminator.check_timeout() {
                warn!("lookup timeout before first seek");
                self.error_result
                    .borrow_mut()
                    .add_error(ErrorCode::LookupTimeout, "timeout in lookup phase");
            }
        }
        if !succ_once {
            warn!("no query executor could be built on any layer");
        }
        succ_once
    }

    fn create_filter_wrapper(
        &mut self,
        clause: Option<&FilterClause>,
        expr_creator: &AttributeExpressionCreator,
    ) -> bool {
        let mut wrapper = FilterWrapper::new();
        if let Some(clause) = clause {
            let mut alloc = self.allocator.borrow_mut();
            match AttrFilter::create(clause, expr_creator, &mut alloc) {
                Some(filter) => wrapper.set_filter(Box::new(filter)),
                None => return false,
            }
        }
        if self.allocator.borrow().has_sub_doc_accessor() {
            wrapper.set_sub_doc_filter(SubDocFilter);
        }
        if !wrapper.is_empty() {
            self.filter = Some(wrapper);
        }
        true
    }

    fn search_multi_layers(
        &mut self,
        resource: &mut RankSearcherResource<'_>,
        collector: &mut dyn HitCollector,
        join: Option<&HashJoinInfo>,
    ) -> u32 {
        resource.metrics.rank_start_trigger();
        if let Some(terminator) = &self.terminator {
            terminator.init(self.config.seek_check_timeout_step);
        }
        let need_score = resource.required_top_k != 0;
        let need_sub_doc = self.allocator.borrow().has_sub_doc_accessor();

        let mut estimator = ResultEstimator::new();
        estimator.init(&self.layer_metas, self.config.agg_sample_max_count);

        let RankSearcher {
            layer_metas,
            allocator,
            terminator,
            error_result,
            executors,
            filter,
            aggregator,
            deletion_map,
            sub_deletion_map,
            main_to_sub,
            ..
        } = self;

        let mut distributor = LayerRangeDistributor::new(layer_metas, resource.rank_size);
        let mut has_truncate = false;
        let mut match_count = 0u32;
        let mut seek_doc_count = 0u64;

        while distributor.has_next_layer() {
            let (layer_idx, layer_meta, quota) = distributor.cur_layer();
            let need_aggregate = aggregator.is_some() && estimator.need_aggregate(layer_idx);
            let mut seek_result = SingleLayerSeekResult {
                left_quota: quota,
                ..Default::default()
            };
            let mut truncate_factor = 1.0;

            if let Some(executor) = executors.get_mut(layer_idx).and_then(Option::as_mut) {
                let param = SingleLayerSearcherParam {
                    executor: executor.as_mut(),
                    layer_meta,
                    quota,
                    filter: filter.as_mut(),
                    deletion_map: deletion_map.as_ref(),
                    allocator: Rc::clone(allocator),
                    terminator: terminator.as_deref(),
                    main_to_sub: main_to_sub.as_ref(),
                    sub_deletion_map: sub_deletion_map.as_ref(),
                    get_all_sub_doc: resource.get_all_sub_doc,
                };
                let layer_aggregator = if need_aggregate {
                    match aggregator.as_mut() {
                        Some(a) => Some(a.as_mut()),
                        None => None,
                    }
                } else {
                    None
                };
                seek_result = if need_score {
                    Self::search_single_layer_with_score(
                        param,
                        need_sub_doc,
                        resource.need_flatten,
                        layer_aggregator,
                        collector,
                        join,
                    )
                } else {
                    Self::search_single_layer_without_score(
                        param,
                        need_sub_doc,
                        layer_aggregator,
                        join,
                    )
                };
                truncate_factor =
                    f64::from(executor.main_chain_df()) / f64::from(executor.current_df().max(1));
                if truncate_factor > 1.0 {
                    has_truncate = true;
                }
            }

            estimator.end_layer(
                layer_idx,
                seek_result.seek_count,
                seek_result.match_count,
                need_aggregate,
                truncate_factor,
            );
            match_count += seek_result.match_count;
            seek_doc_count += seek_result.seek_doc_count;
            debug!(
                layer = layer_idx,
                seeked = seek_result.seek_count,
                left_quota = seek_result.left_quota,
                matched = seek_result.match_count,
                factor = truncate_factor,
                total_matched = estimator.total_match_count(),
                "layer finished"
            );

            if let Some(error) = &seek_result.error {
                if error.is_io() {
                    warn!(%error, "seek stopped by index I/O failure");
                    error_result
                        .borrow_mut()
                        .add_error(ErrorCode::IndexIo, error.to_string());
                } else {
                    // anything non-I/O mid-seek is an index-layer bug
                    warn!(%error, "fatal seek error");
                    error_result
                        .borrow_mut()
                        .add_error(ErrorCode::SearchLookup, error.to_string());
                }
                break;
            }
            if let Some(terminator) = terminator.as_deref() {
                if terminator.is_timeout() {
                    warn!(seeks = terminator.check_times(), "seek timeout");
                    error_result
                        .borrow_mut()
                        .add_error(ErrorCode::SeekDocTimeout, "timeout during seek");
                    break;
                }
            }
            distributor.move_to_next_layer(seek_result.left_quota);
        }

        collector.flush();
        estimator.end_seek();

        if let Some(aggregator) = aggregator.as_deref() {
            resource
                .metrics
                .aggregate_count_trigger(aggregator.aggregate_count());
        }
        resource.metrics.match_count_trigger(match_count);
        resource.metrics.seek_doc_count_trigger(seek_doc_count);
        resource.metrics.seek_count_trigger(
            terminator
                .as_deref()
                .map_or(estimator.total_seeked_count(), TimeoutTerminator::check_times),
        );
        if let Some(join_filter) = filter.as_ref().and_then(FilterWrapper::join_filter) {
            resource
                .metrics
                .strong_join_filter_count_trigger(join_filter.filtered_count());
        }
        if has_truncate {
            resource.metrics.increase_use_truncate_optimizer_num();
        }
        self.match_count = match_count;

        let end_rank_aggregator = match self.aggregator.as_mut() {
            Some(a) => Some(a.as_mut()),
            None => None,
        };
        Self::end_rank_phase(self.filter.as_mut(), end_rank_aggregator, collector);
        debug!(
            total_seeked = estimator.total_seeked_count(),
            matched = match_count,
            total_matched = estimator.total_match_count(),
            "seek session finished"
        );
        estimator.total_match_count()
    }

    fn search_single_layer_with_score(
        param: SingleLayerSearcherParam<'_>,
        need_sub_doc: bool,
        need_flatten: bool,
        mut aggregator: Option<&mut (dyn Aggregator + 'static)>,
        collector: &mut dyn HitCollector,
        join: Option<&HashJoinInfo>,
    ) -> SingleLayerSeekResult {
        let allocator = Rc::clone(&param.allocator);
        let mut searcher = SingleLayerSearcher::new(param);
        let mut error = None;
        loop {
            match searcher.seek(need_sub_doc) {
                Err(e) => {
                    error = Some(e);
                    break;
                }
                Ok(None) => break,
                Ok(Some(doc)) => {
                    if let Some(join) = join {
                        let mut alloc = allocator.borrow_mut();
                        if !join.probe(&mut alloc, doc) {
                            alloc.deallocate(doc);
                            continue;
                        }
                    }
                    if let Some(aggregator) = aggregator.as_deref_mut() {
                        let mut alloc = allocator.borrow_mut();
                        aggregator.aggregate(&mut alloc, doc);
                    }
                    collector.collect(doc, need_flatten);
                }
            }
        }
        SingleLayerSeekResult {
            match_count: collector.steal_collect_count(),
            seek_count: searcher.seeked_count(),
            left_quota: searcher.left_quota(),
            seek_doc_count: searcher.seek_doc_count(),
            error,
        }
    }

    fn search_single_layer_without_score(
        param: SingleLayerSearcherParam<'_>,
        need_sub_doc: bool,
        mut aggregator: Option<&mut (dyn Aggregator + 'static)>,
        join: Option<&HashJoinInfo>,
    ) -> SingleLayerSeekResult {
        let allocator = Rc::clone(&param.allocator);
        let mut searcher = SingleLayerSearcher::new(param);
        let mut error = None;
        let mut match_count = 0u32;
        loop {
            match searcher.seek(need_sub_doc) {
                Err(e) => {
                    error = Some(e);
                    break;
                }
                Ok(None) => break,
                Ok(Some(doc)) => {
                    let mut alloc = allocator.borrow_mut();
                    if let Some(join) = join {
                        if !join.probe(&mut alloc, doc) {
                            alloc.deallocate(doc);
                            continue;
                        }
                    }
                    if let Some(aggregator) = aggregator.as_deref_mut() {
                        aggregator.aggregate(&mut alloc, doc);
                    }
                    match_count += 1;
                    alloc.deallocate(doc);
                }
            }
        }
        SingleLayerSeekResult {
            match_count,
            seek_count: searcher.seeked_count(),
            left_quota: searcher.left_quota(),
            seek_doc_count: searcher.seek_doc_count(),
            error,
        }
    }

    fn end_rank_phase(
        filter: Option<&mut FilterWrapper>,
        aggregator: Option<&mut (dyn Aggregator + 'static)>,
        collector: &mut dyn HitCollector,
    ) {
        if let Some(filter) = filter.and_then(FilterWrapper::filter_mut) {
            filter.update_expr_evaluated_status();
        }
        if let Some(aggregator) = aggregator {
            aggregator.update_expr_evaluated_status();
        }
        collector.update_expr_evaluated_status();
    }
}
