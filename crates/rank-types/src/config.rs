//! Session configuration.
//!
//! The constants that tune the seek loop are injected per session rather
//! than read from process-wide statics, so concurrent sessions on separate
//! arenas can run with different settings.

use serde::{Deserialize, Serialize};

/// Tunables for one seek session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seeks between two timeout-clock checks.
    #[serde(default = "default_seek_check_timeout_step")]
    pub seek_check_timeout_step: u32,

    /// Candidates buffered before the scorer runs over the batch.
    /// Also the head room the collector buffer reserves past `2K`.
    #[serde(default = "default_batch_evaluate_score_size")]
    pub batch_evaluate_score_size: u32,

    /// Aggregation sample cap: later layers stop feeding the aggregator
    /// once this many docs have been aggregated.
    #[serde(default = "default_agg_sample_max_count")]
    pub agg_sample_max_count: u32,
}

fn default_seek_check_timeout_step() -> u32 {
    1024
}

fn default_batch_evaluate_score_size() -> u32 {
    32
}

fn default_agg_sample_max_count() -> u32 {
    100_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seek_check_timeout_step: default_seek_check_timeout_step(),
            batch_evaluate_score_size: default_batch_evaluate_score_size(),
            agg_sample_max_count: default_agg_sample_max_count(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.seek_check_timeout_step == 0 {
            return Err("seek_check_timeout_step must be > 0".to_string());
        }
        if self.batch_evaluate_score_size == 0 {
            return Err("batch_evaluate_score_size must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_step_rejected() {
        let config = SessionConfig {
            seek_check_timeout_step: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.batch_evaluate_score_size, 32);
    }
}
