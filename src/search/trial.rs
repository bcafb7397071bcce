use super::policy::SearchPolicy;
use crate::display;
use crate::engine::{CodecEngine, TrialParams};
use crate::error::JobError;
use crate::prelude::*;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// One measured invocation of the codec engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingTrial {
    pub params: TrialParams,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Runs trials one after another for a single job and keeps their log.
pub(crate) struct TrialRunner<'a> {
    engine: &'a dyn CodecEngine,
    policy: &'a SearchPolicy,
    cancel: &'a CancellationToken,
    input: &'a Utf8Path,
    max_bytes: u64,
    trials: Vec<EncodingTrial>,
}

impl<'a> TrialRunner<'a> {
    pub(crate) fn new(
        engine: &'a dyn CodecEngine,
        policy: &'a SearchPolicy,
        cancel: &'a CancellationToken,
        input: &'a Utf8Path,
        max_bytes: u64,
    ) -> Self {
        Self {
            engine,
            policy,
            cancel,
            input,
            max_bytes,
            trials: vec![],
        }
    }

    pub(crate) fn fits(&self, output: &[u8]) -> bool {
        output.len() as u64 <= self.max_bytes
    }

    pub(crate) fn trials(&self) -> &[EncodingTrial] {
        &self.trials
    }

    pub(crate) fn into_trials(self) -> Vec<EncodingTrial> {
        self.trials
    }

    pub(crate) fn unreachable(&self) -> JobError {
        JobError::SizeBudgetUnreachable {
            max_bytes: self.max_bytes,
            smallest_bytes: self.trials.iter().map(|trial| trial.bytes).min(),
            trials: self.trials.len(),
        }
    }

    /// Invokes the engine with `params`. A failed, empty or timed out
    /// invocation is repeated up to the policy's retry count before it
    /// becomes the job's [`JobError::EncodeFailure`].
    pub(crate) async fn run(&mut self, params: TrialParams) -> Result<Arc<[u8]>, JobError> {
        let mut last_error = None;

        for attempt in 0..=self.policy.trial_retries {
            let start = Instant::now();

            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(JobError::Cancelled),
                result = tokio::time::timeout(
                    self.policy.trial_timeout,
                    self.engine.encode(self.input, &params),
                ) => result,
            };

            let err = match result {
                Ok(Ok(output)) if !output.is_empty() => {
                    let output = Arc::<[u8]>::from(output);
                    self.record(params, &output, start);
                    return Ok(output);
                }
                Ok(Ok(_)) => anyhow!("The codec engine produced an empty output"),
                Ok(Err(err)) => err,
                Err(_) => anyhow!(
                    "The codec engine timed out after {:?}",
                    self.policy.trial_timeout
                ),
            };

            warn!(
                attempt = attempt + 1,
                "Trial with {} failed: {err:#}",
                params.rate
            );

            last_error = Some(err);
        }

        let err = last_error.unwrap_or_else(|| anyhow!("BUG: no trial attempts were made"));

        Err(JobError::encode_failure(err))
    }

    fn record(&mut self, params: TrialParams, output: &[u8], start: Instant) {
        let (checkbox, color) = if self.fits(output) {
            ('✅', nu_ansi_term::Color::Green)
        } else {
            ('❌', nu_ansi_term::Color::Red)
        };

        let size_display = color.bold().paint(display::human_size(output.len()));
        let elapsed = display::elapsed(start);

        info!(
            "{checkbox} {} at {} generated {size_display} in {elapsed}",
            display::bold(&params.rate),
            params.output_dimensions(),
        );

        self.trials.push(EncodingTrial {
            params,
            bytes: output.len() as u64,
            elapsed: start.elapsed(),
        });
    }
}
