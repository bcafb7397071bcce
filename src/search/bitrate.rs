use super::policy::SearchPolicy;
use super::trial::TrialRunner;
use super::Winner;
use crate::engine::{RateControl, TrialParams};
use crate::error::JobError;
use crate::plan::{dimensions, Dimensions};
use crate::prelude::*;

/// Fidelity the bitrate search runs at. Level 0 is the full fidelity,
/// every following one is cheaper than the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DegradeLevel {
    pub(crate) fps: u32,
    pub(crate) long_side: u32,
}

/// Frame rate steps come first, then the long side shrinks at the lowest
/// frame rate.
pub(crate) fn degrade_levels(
    full_fps: u32,
    long_side: u32,
    policy: &SearchPolicy,
) -> Vec<DegradeLevel> {
    let mut fps = full_fps;
    let mut levels = vec![DegradeLevel { fps, long_side }];

    for &next in &policy.fps_ladder {
        if next < fps {
            fps = next;
            levels.push(DegradeLevel { fps, long_side });
        }
    }

    if policy.long_side_decrement == 0 {
        return levels;
    }

    for step in 1..=policy.max_dimension_steps {
        let side = u32::try_from(step)
            .ok()
            .and_then(|step| step.checked_mul(policy.long_side_decrement))
            .and_then(|decrement| long_side.checked_sub(decrement));
        let Some(side) = side else {
            break;
        };
        if side == 0 || side < policy.min_long_side {
            break;
        }
        levels.push(DegradeLevel {
            fps,
            long_side: side,
        });
    }

    levels
}

#[derive(Debug)]
enum SearchState {
    /// First trial at a level, with the bitrate derived from the budget
    Probing { level: usize },
    /// Bitrate scaled down after an overshoot
    Adjusting {
        level: usize,
        bitrate: u64,
        trial: usize,
    },
    /// Trial budget of the level is exhausted
    Degrading { level: usize },
    Succeeded(Winner),
    Unreachable,
}

/// Average bitrate search for videos.
pub(super) struct BitrateSearch<'a> {
    pub(super) policy: &'a SearchPolicy,
    pub(super) base: TrialParams,
    /// Source dimensions, the long side is re-planned at degrade levels
    pub(super) source: Dimensions,
    pub(super) levels: Vec<DegradeLevel>,
    pub(super) max_bytes: u64,
    pub(super) output_secs: f64,
}

impl BitrateSearch<'_> {
    pub(super) async fn run(self, runner: &mut TrialRunner<'_>) -> Result<Winner, JobError> {
        let mut state = SearchState::Probing { level: 0 };

        loop {
            debug!(?state, "Bitrate search");

            state = match state {
                SearchState::Probing { level } => {
                    self.attempt(runner, level, self.initial_bitrate(), 1)
                        .await?
                }
                SearchState::Adjusting {
                    level,
                    bitrate,
                    trial,
                } => self.attempt(runner, level, bitrate, trial).await?,
                SearchState::Degrading { level } => match self.levels.get(level + 1) {
                    Some(next) => {
                        warn!(
                            "Degrading to {} fps with the long side of {}px",
                            next.fps, next.long_side
                        );
                        SearchState::Probing { level: level + 1 }
                    }
                    None => SearchState::Unreachable,
                },
                SearchState::Succeeded(winner) => return Ok(winner),
                SearchState::Unreachable => return Err(runner.unreachable()),
            };
        }
    }

    async fn attempt(
        &self,
        runner: &mut TrialRunner<'_>,
        level: usize,
        bitrate: u64,
        trial: usize,
    ) -> Result<SearchState, JobError> {
        let params = self.params(level, bitrate)?;
        let output = runner.run(params.clone()).await?;

        if runner.fits(&output) {
            return Ok(SearchState::Succeeded(Winner { params, output }));
        }

        let next = self.scale_down(bitrate, output.len() as u64);

        if trial >= self.policy.video_trials || next < self.policy.min_bitrate {
            return Ok(SearchState::Degrading { level });
        }

        Ok(SearchState::Adjusting {
            level,
            bitrate: next,
            trial: trial + 1,
        })
    }

    fn initial_bitrate(&self) -> u64 {
        let bits = self.max_bytes as f64 * 8.0;
        (bits / self.output_secs * self.policy.safety_margin) as u64
    }

    /// Scales the bitrate proportionally to the overshoot.
    fn scale_down(&self, bitrate: u64, measured_bytes: u64) -> u64 {
        let ratio = self.max_bytes as f64 / measured_bytes as f64;
        (bitrate as f64 * ratio * self.policy.safety_margin) as u64
    }

    fn params(&self, level: usize, bitrate: u64) -> Result<TrialParams, JobError> {
        let level = self.levels[level];

        let dimensions = if level.long_side == self.base.dimensions.long_side() {
            self.base.dimensions
        } else {
            dimensions::plan(self.source.width, self.source.height, level.long_side)?
        };

        Ok(TrialParams {
            rate: RateControl::Bitrate(bitrate),
            dimensions,
            fps: Some(level.fps),
            ..self.base.clone()
        })
    }
}
