//! Size-constrained encoding: drives the codec engine with varying
//! quality or bitrate until the output fits into the profile's byte budget.

mod bitrate;
mod policy;
mod quality;
mod trial;

use crate::asset::MediaAsset;
use crate::display;
use crate::engine::{CodecEngine, RateControl, TrialParams};
use crate::error::JobError;
use crate::plan::{Dimensions, TimeWindow};
use crate::prelude::*;
use crate::profile::ConstraintProfile;
use bitrate::BitrateSearch;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trial::TrialRunner;

pub use policy::SearchPolicy;
pub use trial::EncodingTrial;

/// Frame rate used when neither the source nor the profile define one.
const FALLBACK_FPS: u32 = 30;

/// The fitting output of a search together with the parameters that
/// produced it.
pub(crate) struct Winner {
    params: TrialParams,
    output: Arc<[u8]>,
}

impl fmt::Debug for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Winner")
            .field("params", &self.params)
            .field("bytes", &self.output.len())
            .finish()
    }
}

/// Result of a successful search.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub output: Arc<[u8]>,
    pub params: TrialParams,
    pub trials: Vec<EncodingTrial>,
}

#[derive(Debug, Clone)]
pub struct SizeConstrainedEncoder {
    engine: Arc<dyn CodecEngine>,
    policy: Arc<SearchPolicy>,
    cancel: CancellationToken,
}

impl SizeConstrainedEncoder {
    pub fn new(
        engine: Arc<dyn CodecEngine>,
        policy: Arc<SearchPolicy>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            policy,
            cancel,
        }
    }

    /// Searches for the best parameters that make the output of `asset`
    /// fit into `profile.max_bytes`. Trials run strictly one by one, each
    /// depends on the size measured by the previous one.
    pub async fn encode(
        &self,
        asset: &MediaAsset,
        dimensions: Dimensions,
        window: Option<TimeWindow>,
        profile: &ConstraintProfile,
    ) -> Result<Encoded, JobError> {
        let start = std::time::Instant::now();
        let max_bytes_display = display::bold_human_size(profile.max_bytes);

        info!("🚀 Trying to find the best parameters to fit into {max_bytes_display}");

        let mut runner = TrialRunner::new(
            self.engine.as_ref(),
            &self.policy,
            &self.cancel,
            asset.path(),
            profile.max_bytes,
        );

        let base = TrialParams {
            container: profile.container,
            rate: RateControl::Quality(100),
            dimensions,
            canvas: profile
                .square
                .then(|| Dimensions::square(profile.target_long_side)),
            window,
            fps: None,
            strip_audio: profile.strip_audio,
            force_loop: profile.force_loop,
        };

        let winner = match window {
            Some(window) if profile.is_video() => {
                self.search_bitrate(&mut runner, asset, base, window, profile)
                    .await?
            }
            _ if profile.is_video() => {
                return Err(JobError::InvalidDuration(
                    asset.info().duration.unwrap_or_default(),
                ))
            }
            _ => quality::search(&mut runner, base, self.policy.image_trials).await?,
        };

        let trials = runner.into_trials();

        info!(
            "🎉 Found fitting {}, which generates {} in {} after {} trials",
            display::bold(&winner.params.rate),
            display::bold_human_size(winner.output.len()),
            display::elapsed(start),
            trials.len(),
        );

        Ok(Encoded {
            output: winner.output,
            params: winner.params,
            trials,
        })
    }

    async fn search_bitrate(
        &self,
        runner: &mut TrialRunner<'_>,
        asset: &MediaAsset,
        base: TrialParams,
        window: TimeWindow,
        profile: &ConstraintProfile,
    ) -> Result<Winner, JobError> {
        let info = asset.info();

        let source_fps = info
            .frame_rate
            .map(|rate| rate.round() as u32)
            .filter(|&fps| fps > 0);

        let full_fps = match (source_fps, profile.max_fps) {
            (Some(source), Some(max)) => source.min(max),
            (Some(fps), None) | (None, Some(fps)) => fps,
            (None, None) => FALLBACK_FPS,
        };

        let levels = bitrate::degrade_levels(full_fps, base.dimensions.long_side(), &self.policy);

        BitrateSearch {
            policy: &self.policy,
            source: Dimensions {
                width: info.width,
                height: info.height,
            },
            levels,
            max_bytes: profile.max_bytes,
            output_secs: window.duration().as_secs_f64(),
            base,
        }
        .run(runner)
        .await
    }
}
