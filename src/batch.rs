//! Runs the jobs of one user selection: a sticker per input file plus the
//! requested pack icons.

use crate::asset::MediaKind;
use crate::engine::{CodecEngine, FfmpegEngine};
use crate::error::JobError;
use crate::icon::{self, PackKind};
use crate::job::{JobContext, OutputArtifact, ProcessingJob};
use crate::prelude::*;
use crate::profile::{ArtifactClass, ImageFormat};
use crate::search::SearchPolicy;
use crate::util::path::Utf8StemmedPathBuf;
use buildstructor::buildstructor;
use futures::prelude::*;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    File(Utf8PathBuf),
    /// The first sticker of the batch that can back the icon
    FirstSticker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    pub pack: PackKind,
    pub source: IconSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Sticker,
    Icon(PackKind),
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sticker => f.write_str("sticker"),
            Self::Icon(pack) => write!(f, "{pack} pack icon"),
        }
    }
}

#[derive(Debug)]
pub struct JobReport {
    pub source: Utf8PathBuf,
    pub purpose: Purpose,
    pub outcome: Result<OutputArtifact, JobError>,
}

impl JobReport {
    /// `None` if the job failed before the class of its sticker was known.
    pub fn class(&self) -> Option<ArtifactClass> {
        match (&self.outcome, self.purpose) {
            (Ok(artifact), _) => Some(artifact.profile.class),
            (Err(_), Purpose::Icon(pack)) => Some(pack.icon_class()),
            (Err(_), Purpose::Sticker) => None,
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    /// Directory all the artifacts were written to
    pub output_dir: Utf8PathBuf,
    pub reports: Vec<JobReport>,
}

impl BatchReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.reports.iter().filter_map(|report| report.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|report| report.outcome.is_err())
    }
}

pub struct BatchContext {
    inputs: Vec<Utf8PathBuf>,
    output_dir: Utf8PathBuf,
    image_format: ImageFormat,
    icons: Vec<IconRequest>,
    concurrency: NonZeroUsize,
    job_context: JobContext,
}

#[buildstructor]
impl BatchContext {
    #[builder]
    pub fn new(
        inputs: Vec<Utf8PathBuf>,
        output_dir: Utf8PathBuf,
        image_format: Option<ImageFormat>,
        icons: Vec<IconRequest>,

        engine: Option<Arc<dyn CodecEngine>>,
        policy: Option<SearchPolicy>,
        cancel: Option<CancellationToken>,

        concurrency: Option<NonZeroUsize>,
    ) -> Result<Self> {
        if inputs.is_empty() {
            bail!("No input files were specified");
        }

        if !icons.iter().map(|icon| icon.pack).all_unique() {
            bail!("Only one icon per pack kind can be requested, but got {icons:?}");
        }

        let policy = policy.unwrap_or_default();
        policy.validate().context("Invalid search policy")?;

        let job_context = JobContext::new(
            engine.unwrap_or_else(|| Arc::new(FfmpegEngine)),
            policy,
            cancel.unwrap_or_default(),
        );

        Ok(Self {
            inputs,
            output_dir,
            image_format: image_format.unwrap_or_default(),
            icons,
            concurrency: concurrency.unwrap_or_else(Self::default_concurrency),
            job_context,
        })
    }

    pub fn default_concurrency() -> NonZeroUsize {
        std::thread::available_parallelism().unwrap_or_else(|err| {
            let default = NonZeroUsize::MIN;
            warn!(
                err = &err as &dyn std::error::Error,
                "Failed to query the system's available parallelism. \
                Falling back to the default value of {default}.",
            );
            default
        })
    }
}

impl BatchContext {
    async fn input_files(&self) -> Result<Vec<Utf8StemmedPathBuf>> {
        stream::iter(self.inputs.iter().cloned())
            .map(|input| async move {
                crate::fs::files(&input)
                    .await
                    .with_context(|| format!("Failed to read the input `{input}`"))
            })
            .buffered(10)
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flatten()
            .map(TryInto::try_into)
            .try_collect()
    }

    /// Fails only if the selection itself is invalid. Failures of individual
    /// jobs are reported in the [`BatchReport`].
    pub async fn run(self) -> Result<BatchReport> {
        let input_files = self.input_files().await?;

        crate::fs::validate_duplicate_input_names(&input_files)?;

        info!(
            "Processing {} files with the concurrency of {}",
            input_files.len(),
            self.concurrency
        );

        let mut reports: Vec<_> = stream::iter(input_files)
            .enumerate()
            .map(|(id, input)| {
                self.sticker_report(input.into_path_buf())
                    .instrument(info_span!("task", id = id + 1))
            })
            .buffered(self.concurrency.get())
            .collect()
            .await;

        for request in &self.icons {
            let source = match &request.source {
                IconSource::File(path) => path.clone(),
                IconSource::FirstSticker => match first_sticker(&reports, request.pack) {
                    Some(artifact) => artifact.path.clone(),
                    None => {
                        warn!(
                            "No sticker can back the {} pack icon, skipping it",
                            request.pack
                        );
                        continue;
                    }
                },
            };

            let outcome = self
                .icon(source.clone(), request.pack)
                .instrument(info_span!("icon", pack = %request.pack))
                .await;

            reports.push(JobReport {
                source,
                purpose: Purpose::Icon(request.pack),
                outcome,
            });
        }

        let report = BatchReport {
            output_dir: self.output_dir,
            reports,
        };

        report.log_summary();

        Ok(report)
    }

    async fn sticker_report(&self, source: Utf8PathBuf) -> JobReport {
        let outcome = self.sticker(source.clone()).await;

        JobReport {
            source,
            purpose: Purpose::Sticker,
            outcome,
        }
    }

    async fn sticker(&self, source: Utf8PathBuf) -> Result<OutputArtifact, JobError> {
        let ctx = &self.job_context;
        let asset = ctx.probe(source).await?;

        let class = match asset.kind() {
            MediaKind::Image => ArtifactClass::StickerImage,
            MediaKind::Video => ArtifactClass::StickerVideo,
        };

        ProcessingJob::new(asset, class.profile(self.image_format), &self.output_dir)
            .run(ctx)
            .await
    }

    async fn icon(&self, source: Utf8PathBuf, pack: PackKind) -> Result<OutputArtifact, JobError> {
        let ctx = &self.job_context;
        let asset = ctx.probe(source).await?;

        icon::derive_icon(ctx, asset, pack, self.image_format, &self.output_dir).await
    }
}

/// Animated icons need a video sticker. Static ones prefer a static sticker,
/// but fall back to the first frame of a video one.
fn first_sticker(reports: &[JobReport], pack: PackKind) -> Option<&OutputArtifact> {
    let mut stickers = reports
        .iter()
        .filter(|report| report.purpose == Purpose::Sticker)
        .filter_map(|report| report.outcome.as_ref().ok());

    match pack {
        PackKind::Video => stickers.find(|artifact| artifact.profile.is_video()),
        PackKind::Image => {
            let (images, videos): (Vec<_>, Vec<_>) =
                stickers.partition(|artifact| !artifact.profile.is_video());
            images.into_iter().chain(videos).next()
        }
    }
}

impl BatchReport {
    fn log_summary(&self) {
        for report in self.failures() {
            if let Err(err) = &report.outcome {
                warn!(
                    source = %report.source,
                    "Failed to produce the {}: {}",
                    report.purpose,
                    crate::util::error::chain(err),
                );
            }
        }

        info!(
            "✨ Produced {} of {} artifacts in {}",
            self.artifacts().count(),
            self.reports.len(),
            crate::display::bold(&self.output_dir),
        );
    }
}
