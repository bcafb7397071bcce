//! Telegram's constraints for every artifact class the pipeline produces.
//!
//! See <https://core.telegram.org/stickers> for the source of the numbers.

use crate::util::byte_size::KIB;
use std::time::Duration;

const STICKER_LONG_SIDE: u32 = 512;
const ICON_LONG_SIDE: u32 = 100;

const MAX_VIDEO_DURATION: Duration = Duration::from_secs(3);
const MAX_VIDEO_FPS: u32 = 30;

const MAX_STICKER_IMAGE_BYTES: u64 = 512 * KIB;
const MAX_STICKER_VIDEO_BYTES: u64 = 256 * KIB;
const MAX_ICON_IMAGE_BYTES: u64 = 128 * KIB;
const MAX_ICON_VIDEO_BYTES: u64 = 32 * KIB;

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum Container {
    Png,
    Webp,
    Webm,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Webm => "webm",
        }
    }
}

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum Codec {
    None,
    Vp9,
}

/// Container for static artifacts, picked by the user.
#[derive(strum::Display, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum ImageFormat {
    Png,
    #[default]
    Webp,
}

impl From<ImageFormat> for Container {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => Self::Png,
            ImageFormat::Webp => Self::Webp,
        }
    }
}

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactClass {
    StickerImage,
    StickerVideo,
    IconImage,
    IconVideo,
}

impl ArtifactClass {
    pub fn profile(self, image_format: ImageFormat) -> ConstraintProfile {
        match self {
            Self::StickerImage => ConstraintProfile::sticker_image(image_format),
            Self::StickerVideo => ConstraintProfile::STICKER_VIDEO,
            Self::IconImage => ConstraintProfile::icon_image(image_format),
            Self::IconVideo => ConstraintProfile::ICON_VIDEO,
        }
    }

    /// Suffix of the output file name, it makes the naming deterministic.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::StickerImage | Self::StickerVideo => "sticker",
            Self::IconImage | Self::IconVideo => "icon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintProfile {
    pub class: ArtifactClass,

    /// Exact size of the longer side of the output.
    pub target_long_side: u32,

    /// `None` for static artifacts.
    pub max_duration: Option<Duration>,
    pub max_bytes: u64,

    pub container: Container,
    pub codec: Codec,
    pub max_fps: Option<u32>,

    pub force_loop: bool,
    pub strip_audio: bool,

    /// Pad the output with transparent pixels to a square canvas of
    /// `target_long_side`. Telegram displays pack icons as squares.
    pub square: bool,
}

impl ConstraintProfile {
    pub const STICKER_VIDEO: Self = Self {
        class: ArtifactClass::StickerVideo,
        target_long_side: STICKER_LONG_SIDE,
        max_duration: Some(MAX_VIDEO_DURATION),
        max_bytes: MAX_STICKER_VIDEO_BYTES,
        container: Container::Webm,
        codec: Codec::Vp9,
        max_fps: Some(MAX_VIDEO_FPS),
        force_loop: true,
        strip_audio: true,
        square: false,
    };

    pub const ICON_VIDEO: Self = Self {
        class: ArtifactClass::IconVideo,
        target_long_side: ICON_LONG_SIDE,
        max_bytes: MAX_ICON_VIDEO_BYTES,
        square: true,
        ..Self::STICKER_VIDEO
    };

    pub const fn sticker_image(format: ImageFormat) -> Self {
        Self {
            class: ArtifactClass::StickerImage,
            target_long_side: STICKER_LONG_SIDE,
            max_duration: None,
            max_bytes: MAX_STICKER_IMAGE_BYTES,
            container: match format {
                ImageFormat::Png => Container::Png,
                ImageFormat::Webp => Container::Webp,
            },
            codec: Codec::None,
            max_fps: None,
            force_loop: false,
            strip_audio: true,
            square: false,
        }
    }

    pub const fn icon_image(format: ImageFormat) -> Self {
        Self {
            class: ArtifactClass::IconImage,
            target_long_side: ICON_LONG_SIDE,
            max_bytes: MAX_ICON_IMAGE_BYTES,
            square: true,
            ..Self::sticker_image(format)
        }
    }

    pub fn is_video(&self) -> bool {
        self.max_duration.is_some()
    }
}
