use super::webm_vp9_two_pass::TwoPassContext;
use super::{args, probe, CodecEngine, TrialParams};
use crate::asset::MediaInfo;
use crate::prelude::*;
use crate::profile::Container;
use crate::util::cmd;
use async_trait::async_trait;

/// Engine that spawns `ffmpeg` and `ffprobe` processes found in `PATH`.
#[derive(Debug, Default)]
pub struct FfmpegEngine;

#[async_trait]
impl CodecEngine for FfmpegEngine {
    async fn encode(&self, input: &Utf8Path, params: &TrialParams) -> Result<Vec<u8>> {
        // Every trial gets its own directory, so concurrent jobs never
        // share pass logs or outputs
        let temp_dir = tempfile::tempdir()?;
        let work_dir = temp_dir.path().unwrap_utf8();

        match params.container {
            Container::Webm => TwoPassContext::new(input, params, work_dir)?.run().await,
            Container::Png | Container::Webp => {
                let output = work_dir.join(format!("output.{}", params.container.extension()));
                cmd::ffmpeg(args::image(input, params, &output)?).await?;
                fs::read(&output).await.err_into()
            }
        }
    }

    async fn probe(&self, path: &Utf8Path) -> Result<MediaInfo> {
        let output = cmd::ffprobe(probe::args(path)).await?;
        probe::parse(&output)
    }
}
