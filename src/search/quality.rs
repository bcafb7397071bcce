use super::trial::TrialRunner;
use super::Winner;
use crate::engine::{RateControl, TrialParams};
use crate::error::JobError;

const MIN_QUALITY: u8 = 1;
const MAX_QUALITY: u8 = 100;

/// Still images: lossless first, then a binary search for the highest
/// quality that fits, bounded by the policy's trial budget.
pub(super) async fn search(
    runner: &mut TrialRunner<'_>,
    base: TrialParams,
    trial_budget: usize,
) -> Result<Winner, JobError> {
    let with_quality = |quality| TrialParams {
        rate: RateControl::Quality(quality),
        ..base.clone()
    };

    let params = with_quality(MAX_QUALITY);
    let output = runner.run(params.clone()).await?;

    if runner.fits(&output) {
        return Ok(Winner { params, output });
    }

    let mut min = MIN_QUALITY;
    let mut max = MAX_QUALITY - 1;
    let mut best = None;

    while min <= max && runner.trials().len() < trial_budget {
        let mid = (min + max) / 2;

        let params = with_quality(mid);
        let output = runner.run(params.clone()).await?;

        if runner.fits(&output) {
            // Everything at or below `mid` fits, look for a higher quality
            best = Some(Winner { params, output });
            min = mid + 1;
        } else {
            max = mid - 1;
        }
    }

    best.ok_or_else(|| runner.unreachable())
}
