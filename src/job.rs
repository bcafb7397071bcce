use crate::asset::{MediaAsset, MediaKind};
use crate::engine::CodecEngine;
use crate::error::JobError;
use crate::materialize;
use crate::plan::{dimensions, window, Dimensions};
use crate::prelude::*;
use crate::profile::ConstraintProfile;
use crate::search::{Encoded, SearchPolicy, SizeConstrainedEncoder};
use anyhow::anyhow;
use nu_ansi_term::Color;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything the jobs of one batch share. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub(crate) engine: Arc<dyn CodecEngine>,
    pub(crate) policy: Arc<SearchPolicy>,
    pub(crate) cancel: CancellationToken,
}

impl JobContext {
    pub fn new(
        engine: Arc<dyn CodecEngine>,
        policy: SearchPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            policy: Arc::new(policy),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) async fn probe(&self, path: Utf8PathBuf) -> Result<MediaAsset, JobError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(JobError::Cancelled),
            asset = MediaAsset::probe(self.engine.as_ref(), path) => asset,
        }
    }
}

/// The persisted result of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub path: Utf8PathBuf,
    pub profile: ConstraintProfile,
    pub bytes: u64,
    /// Measured on the written output
    pub dimensions: Dimensions,
    /// Measured on the written output, `None` for still images
    pub duration: Option<Duration>,
    pub trials: usize,
}

/// One source asset paired with the profile of the artifact to produce.
#[derive(Debug)]
pub struct ProcessingJob {
    asset: MediaAsset,
    profile: ConstraintProfile,
    output: Utf8PathBuf,
}

impl ProcessingJob {
    pub fn new(asset: MediaAsset, profile: ConstraintProfile, output_dir: &Utf8Path) -> Self {
        let output = materialize::output_path(output_dir, asset.file_stem(), &profile);
        Self {
            asset,
            profile,
            output,
        }
    }

    /// Probes `source` and pairs it with `profile`. Fails with
    /// [`JobError::Probe`] before any encoding if the source is unreadable.
    pub async fn create(
        ctx: &JobContext,
        source: Utf8PathBuf,
        profile: ConstraintProfile,
        output_dir: &Utf8Path,
    ) -> Result<Self, JobError> {
        let asset = ctx.probe(source).await?;
        Ok(Self::new(asset, profile, output_dir))
    }

    pub fn asset(&self) -> &MediaAsset {
        &self.asset
    }

    pub fn profile(&self) -> &ConstraintProfile {
        &self.profile
    }

    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    #[instrument(
        name = "job",
        skip_all,
        fields(class = %self.profile.class, input = %self.asset.path())
    )]
    pub async fn run(self, ctx: &JobContext) -> Result<OutputArtifact, JobError> {
        if ctx.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let info = self.asset.info();

        if self.profile.is_video() && info.kind == MediaKind::Image {
            return Err(JobError::ProfileMismatch {
                asset_kind: info.kind,
                class: self.profile.class,
            });
        }

        let dimensions = dimensions::plan(info.width, info.height, self.profile.target_long_side)?;

        let window = self
            .profile
            .max_duration
            .map(|max| window::plan(info.duration.unwrap_or_default(), max))
            .transpose()?;

        debug!(%dimensions, ?window, "Planned the output");

        let encoder = SizeConstrainedEncoder::new(
            ctx.engine.clone(),
            ctx.policy.clone(),
            ctx.cancel.clone(),
        );

        let encoded = encoder
            .encode(&self.asset, dimensions, window, &self.profile)
            .await?;

        self.materialize(ctx, encoded).await
    }

    async fn materialize(
        &self,
        ctx: &JobContext,
        encoded: Encoded,
    ) -> Result<OutputArtifact, JobError> {
        let bytes = encoded.output.len() as u64;

        if bytes > self.profile.max_bytes {
            return Err(JobError::SizeBudgetUnreachable {
                max_bytes: self.profile.max_bytes,
                smallest_bytes: Some(bytes),
                trials: encoded.trials.len(),
            });
        }

        let staged = materialize::stage(&encoded.output, &self.output).await?;

        let measured = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Err(JobError::Cancelled),
            info = ctx.engine.probe(staged.path()) => info,
        }
        .context("Failed to probe the produced output")
        .map_err(JobError::encode_failure)?;

        let duration = measured.duration();

        if let Some(max) = self.profile.max_duration {
            let duration = duration
                .ok_or_else(|| anyhow!("The produced output has no duration"))
                .map_err(JobError::encode_failure)?;

            if duration > max {
                return Err(JobError::encode_failure(anyhow!(
                    "The produced output lasts {duration:.2?}, which exceeds the limit of {max:?}"
                )));
            }
        }

        if ctx.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let path = staged.commit()?;

        info!(
            "🔥 Saved {} to {}",
            crate::display::bold_human_size(bytes),
            Color::Magenta.bold().paint(path.as_str()),
        );

        Ok(OutputArtifact {
            path,
            profile: self.profile,
            bytes,
            dimensions: Dimensions {
                width: measured.width,
                height: measured.height,
            },
            duration,
            trials: encoded.trials.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{self, SharedMockEngine};
    use crate::profile::{ArtifactClass, ImageFormat};

    struct Fixture {
        _dir: tempfile::TempDir,
        output_dir: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let output_dir = dir.path().unwrap_utf8().join("out");
            Self {
                _dir: dir,
                output_dir,
            }
        }

        fn ctx(&self, engine: &Arc<SharedMockEngine>) -> JobContext {
            JobContext::new(
                engine.clone() as Arc<dyn CodecEngine>,
                SearchPolicy::default(),
                CancellationToken::new(),
            )
        }

        async fn run(
            &self,
            ctx: &JobContext,
            source: &str,
            profile: ConstraintProfile,
        ) -> Result<OutputArtifact, JobError> {
            ProcessingJob::create(ctx, source.into(), profile, &self.output_dir)
                .await?
                .run(ctx)
                .await
        }
    }

    #[test_log::test(tokio::test)]
    async fn video_sticker_fits_all_constraints() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::new(|params| testing::video_size(params, 1.25, 0))
            .with_source("clip.mp4", testing::video_info(1920, 1080, 5.0));
        let ctx = fixture.ctx(&engine);

        let artifact = fixture
            .run(&ctx, "clip.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap();

        assert_eq!(artifact.path, fixture.output_dir.join("clip-sticker.webm"));
        assert_eq!(artifact.dimensions, Dimensions { width: 512, height: 288 });
        assert_eq!(artifact.duration, Some(Duration::from_secs(3)));
        assert!(artifact.bytes <= 256 * 1024);
        assert_eq!(artifact.trials, 2);

        let written = std::fs::read(&artifact.path).unwrap();
        assert_eq!(written.len() as u64, artifact.bytes);

        let last = engine.params_log().pop().unwrap();
        assert!(last.strip_audio);
        assert!(last.force_loop);
    }

    #[test_log::test(tokio::test)]
    async fn square_image_with_unbounded_budget() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::tiny()
            .with_source("cat.png", testing::image_info(2000, 2000));
        let ctx = fixture.ctx(&engine);

        let profile = ConstraintProfile {
            max_bytes: u64::MAX,
            ..ConstraintProfile::sticker_image(ImageFormat::Png)
        };

        let artifact = fixture.run(&ctx, "cat.png", profile).await.unwrap();

        assert_eq!(artifact.dimensions, Dimensions::square(512));
        assert_eq!(artifact.duration, None);
        assert_eq!(artifact.trials, 1);
        assert_eq!(artifact.path, fixture.output_dir.join("cat-sticker.png"));
    }

    #[test_log::test(tokio::test)]
    async fn corrupt_source_fails_before_any_trial() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::tiny();
        let ctx = fixture.ctx(&engine);

        let err = fixture
            .run(&ctx, "corrupt.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Probe(_)), "{err:?}");
        assert!(engine.params_log().is_empty());
        assert!(!fixture.output_dir.exists());
    }

    #[test_log::test(tokio::test)]
    async fn still_image_cant_become_video_sticker() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::tiny()
            .with_source("cat.png", testing::image_info(640, 480));
        let ctx = fixture.ctx(&engine);

        let err = fixture
            .run(&ctx, "cat.png", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                JobError::ProfileMismatch {
                    asset_kind: MediaKind::Image,
                    class: ArtifactClass::StickerVideo,
                }
            ),
            "{err:?}"
        );
        assert!(engine.params_log().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn rerunning_a_job_is_idempotent() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::new(|params| testing::video_size(params, 1.25, 0))
            .with_source("clip.mp4", testing::video_info(1920, 1080, 5.0));
        let ctx = fixture.ctx(&engine);

        let first = fixture
            .run(&ctx, "clip.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap();
        let second = fixture
            .run(&ctx, "clip.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap();

        assert_eq!(first, second);

        let entries = std::fs::read_dir(&fixture.output_dir).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test_log::test(tokio::test)]
    async fn output_over_the_duration_limit_is_rejected() {
        let fixture = Fixture::new();

        // The engine ignores the requested window and keeps the whole source
        let engine = SharedMockEngine::tiny()
            .with_source("clip.mp4", testing::video_info(640, 480, 5.0))
            .with_source_pattern("clip-sticker.webm", testing::video_info(512, 384, 5.0));
        let ctx = fixture.ctx(&engine);

        let err = fixture
            .run(&ctx, "clip.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::EncodeFailure(_)), "{err:?}");
        assert!(!fixture.output_dir.join("clip-sticker.webm").exists());
    }

    #[test_log::test(tokio::test)]
    async fn absurd_source_duration_is_rejected() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::tiny()
            .with_source("clip.mp4", testing::video_info(640, 480, 1e20));
        let ctx = fixture.ctx(&engine);

        let err = fixture
            .run(&ctx, "clip.mp4", ConstraintProfile::STICKER_VIDEO)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidDuration(_)), "{err:?}");
        assert_eq!(engine.lock().encode_calls, 0);
        assert!(!fixture.output_dir.exists());
    }

    #[test_log::test(tokio::test)]
    async fn cancelled_job_writes_nothing() {
        let fixture = Fixture::new();
        let engine = SharedMockEngine::tiny()
            .with_source("clip.mp4", testing::video_info(640, 480, 2.0));
        let ctx = fixture.ctx(&engine);

        let job = ProcessingJob::create(
            &ctx,
            "clip.mp4".into(),
            ConstraintProfile::STICKER_VIDEO,
            &fixture.output_dir,
        )
        .await
        .unwrap();

        ctx.cancel_token().cancel();

        let err = job.run(&ctx).await.unwrap_err();

        assert!(matches!(err, JobError::Cancelled), "{err:?}");
        assert_eq!(engine.lock().encode_calls, 0);
        assert!(!fixture.output_dir.exists());
    }
}
