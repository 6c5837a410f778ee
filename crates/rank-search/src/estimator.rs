//! Total-match estimation across layers.
//!
//! Only part of the corpus is seeked; the total match count reported
//! upward extrapolates what was seen over the covered range to the whole
//! request range, boosted by the truncate-chain factor when the posting
//! chain was a shortened prefix. The estimate never shrinks across layers
//! and never undercuts the matches actually counted.

use rank_types::LayerMeta;

#[derive(Debug, Default)]
pub struct ResultEstimator {
    layer_sizes: Vec<u64>,
    total_size: u64,
    covered_size: u64,
    total_seeked: u32,
    matched: u32,
    agg_matched: u32,
    agg_sample_max: u32,
    estimate: u32,
}

impl ResultEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, layers: &[LayerMeta], agg_sample_max: u32) {
        self.layer_sizes = layers.iter().map(LayerMeta::range_size).collect();
        self.total_size = self.layer_sizes.iter().sum();
        self.agg_sample_max = agg_sample_max;
    }

    /// Later layers aggregate only while the sample cap still has room.
    pub fn need_aggregate(&self, layer: usize) -> bool {
        layer == 0 || self.agg_matched < self.agg_sample_max
    }

    pub fn end_layer(
        &mut self,
        layer: usize,
        seek_count: u32,
        match_count: u32,
        aggregated: bool,
        truncate_chain_factor: f64,
    ) {
        self.covered_size += self.layer_sizes.get(layer).copied().unwrap_or(0);
        self.total_seeked = self.total_seeked.saturating_add(seek_count);
        self.matched = self.matched.saturating_add(match_count);
        if aggregated {
            self.agg_matched = self.agg_matched.saturating_add(match_count);
        }

        let projected = if self.covered_size > 0 {
            let scale = self.total_size as f64 / self.covered_size as f64;
            let factor = truncate_chain_factor.max(1.0);
            (self.matched as f64 * factor * scale).round() as u32
        } else {
            self.matched
        };
        self.estimate = self.estimate.max(projected).max(self.matched);
    }

    pub fn end_seek(&mut self) {
        self.estimate = self.estimate.max(self.matched);
    }

    pub fn total_match_count(&self) -> u32 {
        self.estimate
    }

    pub fn match_count(&self) -> u32 {
        self.matched
    }

    pub fn total_seeked_count(&self) -> u32 {
        self.total_seeked
    }
}
