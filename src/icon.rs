//! Pack icons (thumbnails), derived from a source asset or from an already
//! produced sticker.

use crate::asset::{MediaAsset, MediaKind};
use crate::error::JobError;
use crate::job::{JobContext, OutputArtifact, ProcessingJob};
use crate::prelude::*;
use crate::profile::{ArtifactClass, ConstraintProfile, ImageFormat};

/// Kind of the sticker pack an icon is produced for.
#[derive(strum::Display, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum PackKind {
    Image,
    Video,
}

impl PackKind {
    pub fn icon_class(self) -> ArtifactClass {
        match self {
            Self::Image => ArtifactClass::IconImage,
            Self::Video => ArtifactClass::IconVideo,
        }
    }

    pub fn icon_profile(self, image_format: ImageFormat) -> ConstraintProfile {
        self.icon_class().profile(image_format)
    }
}

/// Produces the icon of a `pack` from `asset`. A video can back a static
/// icon (its first frame is used), but a still image can't back an animated
/// one.
pub async fn derive_icon(
    ctx: &JobContext,
    asset: MediaAsset,
    pack: PackKind,
    image_format: ImageFormat,
    output_dir: &Utf8Path,
) -> Result<OutputArtifact, JobError> {
    let class = pack.icon_class();

    if pack == PackKind::Video && asset.kind() == MediaKind::Image {
        return Err(JobError::ProfileMismatch {
            asset_kind: asset.kind(),
            class,
        });
    }

    info!(%pack, source = %asset.path(), "Deriving the pack icon");

    ProcessingJob::new(asset, class.profile(image_format), output_dir)
        .run(ctx)
        .await
}

/// Same as [`derive_icon`], but the source is a sticker produced earlier.
pub async fn derive_icon_from_artifact(
    ctx: &JobContext,
    sticker: &OutputArtifact,
    pack: PackKind,
    image_format: ImageFormat,
    output_dir: &Utf8Path,
) -> Result<OutputArtifact, JobError> {
    let asset = ctx.probe(sticker.path.clone()).await?;
    derive_icon(ctx, asset, pack, image_format, output_dir).await
}
