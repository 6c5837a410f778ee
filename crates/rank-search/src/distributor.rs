//! Quota distribution across retrieval layers.

use rank_types::LayerMeta;
use tracing::debug;

/// Walks layers in order and hands each its effective seek quota.
///
/// A layer's effective quota is its own plus whatever earlier layers left
/// unused, and never more than what the rank size still allows: quota a
/// layer consumed counts as collected for the layers after it.
pub struct LayerRangeDistributor<'a> {
    layers: &'a [LayerMeta],
    current: usize,
    cur_quota: u32,
    rank_size: u32,
    used: u32,
}

impl<'a> LayerRangeDistributor<'a> {
    pub fn new(layers: &'a [LayerMeta], rank_size: u32) -> Self {
        let mut distributor = Self {
            layers,
            current: 0,
            cur_quota: 0,
            rank_size,
            used: 0,
        };
        distributor.cur_quota = distributor.effective_quota(0, 0);
        distributor
    }

    pub fn has_next_layer(&self) -> bool {
        self.current < self.layers.len() && self.cur_quota > 0
    }

    /// The layer index, its metadata, and its effective quota.
    pub fn cur_layer(&self) -> (usize, &'a LayerMeta, u32) {
        (self.current, &self.layers[self.current], self.cur_quota)
    }

    /// Finish the current layer; `left_quota` rolls into the next one.
    pub fn move_to_next_layer(&mut self, left_quota: u32) {
        let consumed = self.cur_quota.saturating_sub(left_quota);
        self.used = self.used.saturating_add(consumed);
        self.current += 1;
        self.cur_quota = self.effective_quota(self.current, left_quota);
        debug!(
            layer = self.current,
            carried = left_quota,
            quota = self.cur_quota,
            "layer quota rolled"
        );
    }

    fn effective_quota(&self, layer: usize, carried: u32) -> u32 {
        let Some(meta) = self.layers.get(layer) else {
            return 0;
        };
        let residual = self.rank_size.saturating_sub(self.used);
        meta.quota.saturating_add(carried).min(residual)
    }
}
