//! Converts images and videos into artifacts that satisfy the Telegram
//! sticker format: stickers and sticker pack icons with a fixed long side,
//! a limited duration and a hard limit on the file size.
//!
//! The actual transcoding is delegated to `ffmpeg` behind the
//! [`CodecEngine`] trait. This crate plans the parameters, searches for the
//! ones that fit into the size budget and writes the winning output.

mod cmd;
mod display;
mod fs;
mod prelude;
mod util;

pub mod asset;
pub mod batch;
pub mod engine;
pub mod error;
pub mod icon;
pub mod job;
pub mod materialize;
pub mod plan;
pub mod profile;
pub mod search;

pub use asset::{MediaAsset, MediaInfo, MediaKind};
pub use batch::{BatchContext, BatchReport, IconRequest, IconSource, JobReport};
pub use engine::{CodecEngine, FfmpegEngine};
pub use error::JobError;
pub use icon::PackKind;
pub use job::{JobContext, OutputArtifact, ProcessingJob};
pub use profile::{ArtifactClass, ConstraintProfile, ImageFormat};
pub use search::{SearchPolicy, SizeConstrainedEncoder};

use clap::Parser;
use cmd::Cmd;

/// A tool that converts media files into Telegram stickers and pack icons
#[derive(Parser, Debug)]
#[command(version)]
enum Args {
    Sticker(cmd::Sticker),
}

pub async fn run() -> anyhow::Result<()> {
    match Args::parse() {
        Args::Sticker(cmd) => cmd.run().await,
    }
}
