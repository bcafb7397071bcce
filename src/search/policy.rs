use crate::prelude::*;
use std::time::Duration;

/// Tunables of the size search. They are policy rather than math, so they
/// are exposed as configuration shared read-only by all jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPolicy {
    /// Fraction of the theoretical bitrate actually requested, the rest is
    /// left for the container overhead.
    pub safety_margin: f64,

    /// Trial budget of the still image quality search, including the first
    /// lossless trial.
    pub image_trials: usize,

    /// Trial budget of the bitrate search at a single degrade level.
    pub video_trials: usize,

    /// How many times a failed engine invocation is repeated with the same
    /// parameters.
    pub trial_retries: usize,
    pub trial_timeout: Duration,

    /// Bitrate search at a degrade level stops when the next bitrate would
    /// go below this floor (bits per second).
    pub min_bitrate: u64,

    /// Frame rates tried, in order, when the full frame rate doesn't fit.
    pub fps_ladder: Vec<u32>,

    /// Long side reduction per dimension degrade step. Must be even.
    pub long_side_decrement: u32,
    pub min_long_side: u32,
    pub max_dimension_steps: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            safety_margin: 0.9,
            image_trials: 8,
            video_trials: 6,
            trial_retries: 1,
            trial_timeout: Duration::from_secs(120),
            min_bitrate: 8_000,
            fps_ladder: vec![24, 15],
            long_side_decrement: 32,
            min_long_side: 32,
            max_dimension_steps: 3,
        }
    }
}

impl SearchPolicy {
    pub fn validate(&self) -> Result {
        if !(self.safety_margin > 0.0 && self.safety_margin <= 1.0) {
            bail!(
                "Safety margin must be in (0, 1], but got {}",
                self.safety_margin
            );
        }
        if self.image_trials == 0 || self.video_trials == 0 {
            bail!("Trial budgets must be positive: {self:?}");
        }
        if self.trial_timeout.is_zero() {
            bail!("Trial timeout must be positive");
        }
        if self.long_side_decrement % 2 != 0 || self.min_long_side % 2 != 0 {
            bail!(
                "Long side decrement ({}) and minimum ({}) must be even",
                self.long_side_decrement,
                self.min_long_side,
            );
        }
        if self.fps_ladder.contains(&0) {
            bail!("Frame rate ladder must not contain zero: {:?}", self.fps_ladder);
        }
        Ok(())
    }
}
