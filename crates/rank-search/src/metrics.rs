//! Per-session metrics counters.

use std::time::Instant;

/// Counters one seek session reports upward.
#[derive(Debug, Default)]
pub struct SessionMetricsCollector {
    rank_started_at: Option<Instant>,
    match_count: u32,
    seek_count: u32,
    seek_doc_count: u64,
    aggregate_count: u32,
    strong_join_filter_count: u32,
    use_truncate_optimizer_num: u32,
}

impl SessionMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rank_start_trigger(&mut self) {
        self.rank_started_at = Some(Instant::now());
    }

    pub fn match_count_trigger(&mut self, count: u32) {
        self.match_count = count;
    }

    pub fn seek_count_trigger(&mut self, count: u32) {
        self.seek_count = count;
    }

    pub fn seek_doc_count_trigger(&mut self, count: u64) {
        self.seek_doc_count = count;
    }

    pub fn aggregate_count_trigger(&mut self, count: u32) {
        self.aggregate_count = count;
    }

    pub fn strong_join_filter_count_trigger(&mut self, count: u32) {
        self.strong_join_filter_count = count;
    }

    pub fn increase_use_truncate_optimizer_num(&mut self) {
        self.use_truncate_optimizer_num += 1;
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn seek_count(&self) -> u32 {
        self.seek_count
    }

    pub fn seek_doc_count(&self) -> u64 {
        self.seek_doc_count
    }

    pub fn aggregate_count(&self) -> u32 {
        self.aggregate_count
    }

    pub fn strong_join_filter_count(&self) -> u32 {
        self.strong_join_filter_count
    }

    pub fn use_truncate_optimizer_num(&self) -> u32 {
        self.use_truncate_optimizer_num
    }

    pub fn rank_elapsed_ms(&self) -> Option<u64> {
        self.rank_started_at
            .map(|t| t.elapsed().as_millis() as u64)
    }
}
