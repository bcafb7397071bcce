//! The external codec engine. The search algorithm only ever talks to it
//! through [`CodecEngine`], so it never parses or generates container bytes.

mod args;
mod ffmpeg;
mod probe;
mod webm_vp9_two_pass;

#[cfg(test)]
pub(crate) mod testing;

use crate::asset::MediaInfo;
use crate::plan::{Dimensions, TimeWindow};
use crate::prelude::*;
use crate::profile::Container;
use async_trait::async_trait;
use std::fmt;

pub use ffmpeg::FfmpegEngine;

#[async_trait]
pub trait CodecEngine: fmt::Debug + Send + Sync {
    /// Transcodes the file at `input` with the given parameters and returns
    /// the bytes of the produced container.
    async fn encode(&self, input: &Utf8Path, params: &TrialParams) -> Result<Vec<u8>>;

    /// Reads the metadata of a media file.
    async fn probe(&self, path: &Utf8Path) -> Result<MediaInfo>;
}

/// The knob the size search turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// Still image quality in `1..=100` where 100 is lossless.
    Quality(u8),
    /// Target video bitrate in bits per second.
    Bitrate(u64),
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quality(quality) => write!(f, "quality {quality}"),
            Self::Bitrate(bitrate) => write!(f, "bitrate {}k", bitrate / 1000),
        }
    }
}

/// Everything the engine needs to produce one candidate output.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialParams {
    pub container: Container,
    pub rate: RateControl,

    /// Size the content is scaled to.
    pub dimensions: Dimensions,

    /// Transparent canvas the scaled content is centered on, if any.
    pub canvas: Option<Dimensions>,

    /// `None` for still outputs.
    pub window: Option<TimeWindow>,
    pub fps: Option<u32>,

    pub strip_audio: bool,
    pub force_loop: bool,
}

impl TrialParams {
    /// Dimensions of the produced frames.
    pub fn output_dimensions(&self) -> Dimensions {
        self.canvas.unwrap_or(self.dimensions)
    }
}
