use crate::batch::{BatchContext, IconRequest, IconSource};
use crate::icon::PackKind;
use crate::prelude::*;
use crate::profile::ImageFormat;
use crate::search::SearchPolicy;
use async_trait::async_trait;
use clap::Parser;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Convert images and videos into Telegram stickers and pack icons
///
/// Every input becomes `<name>-sticker.<ext>` in the output directory.
/// Videos and animations produce a looping VP9 WEBM of at most 3 seconds
/// and 256 KiB, still images produce a PNG or WEBP of at most 512 KiB.
/// The longer side of a sticker is always 512 pixels.
///
/// If the encoded output doesn't fit into the size limit on the first try,
/// the encoder searches for the highest quality (images) or bitrate
/// (videos) that fits, lowering the frame rate and the dimensions of videos
/// as the last resort.
#[derive(Parser, Debug)]
pub struct Sticker {
    /// Input media files or directories. Directories are not traversed
    /// recursively.
    #[clap(required = true)]
    inputs: Vec<Utf8PathBuf>,

    /// Directory where the artifacts are written. Existing artifacts with
    /// the same names are overwritten.
    #[clap(long, short, default_value = "output")]
    output_dir: Utf8PathBuf,

    /// Container of the static stickers and icons
    #[clap(long, value_enum, default_value_t)]
    image_format: ImageFormat,

    /// Also produce the 100x100 icon of a video sticker pack. The icon is
    /// derived from the given file, or from the first video sticker of
    /// this batch if no file is given.
    #[clap(long, value_name = "PATH", num_args = 0..=1)]
    video_icon: Option<Option<Utf8PathBuf>>,

    /// Also produce the 100x100 icon of a static sticker pack. The icon is
    /// derived from the given file, or from the first sticker of this batch
    /// if no file is given.
    #[clap(long, value_name = "PATH", num_args = 0..=1)]
    static_icon: Option<Option<Utf8PathBuf>>,

    /// Max number of inputs processed in parallel. Defaults to the number
    /// of available CPU cores.
    #[clap(long)]
    concurrency: Option<NonZeroUsize>,

    /// Max duration of a single ffmpeg invocation in the `[[hours:]minutes:]seconds` format
    #[clap(long, value_parser = crate::util::duration::parse, default_value = "2:00")]
    trial_timeout: Duration,

    /// Fraction of the theoretical bitrate that is requested from the
    /// encoder, the rest is reserved for the container overhead
    #[clap(long, default_value_t = SearchPolicy::default().safety_margin)]
    safety_margin: f64,
}

#[async_trait]
impl crate::cmd::Cmd for Sticker {
    async fn run(self) -> Result {
        let cancel = CancellationToken::new();

        let icon = |pack, source: Option<Option<Utf8PathBuf>>| {
            source.map(|path| IconRequest {
                pack,
                source: path.map(IconSource::File).unwrap_or(IconSource::FirstSticker),
            })
        };

        let icons = [
            icon(PackKind::Video, self.video_icon),
            icon(PackKind::Image, self.static_icon),
        ]
        .into_iter()
        .flatten()
        .collect_vec();

        let policy = SearchPolicy {
            trial_timeout: self.trial_timeout,
            safety_margin: self.safety_margin,
            ..Default::default()
        };

        let batch = BatchContext::builder()
            .inputs(self.inputs)
            .output_dir(self.output_dir)
            .image_format(self.image_format)
            .icons(icons)
            .policy(policy)
            .cancel(cancel.clone())
            .and_concurrency(self.concurrency)
            .build()?;

        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling the jobs...");
                cancel.cancel();
            }
        });

        let report = batch.run().await;

        ctrl_c.abort();

        let report = report?;
        let failed = report.failures().count();

        if failed > 0 {
            bail!(
                "{failed} of {} jobs failed, see the logs above",
                report.reports.len()
            );
        }

        Ok(())
    }
}
