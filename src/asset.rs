use crate::engine::CodecEngine;
use crate::error::JobError;
use crate::prelude::*;
use crate::util::path::Utf8StemmedPathBuf;
use std::time::Duration;

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Metadata reported by the codec engine's probe.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    /// Seconds, `None` for still images.
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn duration(&self) -> Option<Duration> {
        self.duration
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Source file together with its probed metadata.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    path: Utf8StemmedPathBuf,
    info: MediaInfo,
}

impl MediaAsset {
    /// Probes the file at `path`. Unreadable or corrupt files fail here,
    /// before any encoding is attempted.
    #[instrument(skip_all, fields(%path))]
    pub async fn probe(engine: &dyn CodecEngine, path: Utf8PathBuf) -> Result<Self, JobError> {
        let path = Utf8StemmedPathBuf::try_from(path).map_err(JobError::probe)?;

        let info = engine
            .probe(path.as_path())
            .await
            .with_context(|| format!("Failed to probe `{path}`"))
            .map_err(JobError::probe)?;

        debug!(?info, "Probed the source");

        Ok(Self { path, info })
    }

    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    pub fn file_stem(&self) -> &str {
        self.path.file_stem()
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn kind(&self) -> MediaKind {
        self.info.kind
    }
}
