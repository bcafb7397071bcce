use crate::asset::MediaKind;
use crate::display;
use crate::profile::ArtifactClass;
use camino::Utf8PathBuf;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal outcome of a failed processing job.
///
/// Failures of individual encoding trials never show up here directly,
/// they are retried by the encoder and only the last one is reported
/// as [`JobError::EncodeFailure`].
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("invalid geometry {width}x{height} for the target long side {target_long_side}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        target_long_side: u32,
    },

    #[error("invalid source duration: {0}s")]
    InvalidDuration(f64),

    #[error("{asset_kind} asset can't back a {class} artifact")]
    ProfileMismatch {
        asset_kind: MediaKind,
        class: ArtifactClass,
    },

    #[error("couldn't probe the source asset")]
    Probe(#[source] BoxError),

    #[error("codec engine failed")]
    EncodeFailure(#[source] BoxError),

    #[error(
        "the output can't fit into {} after {trials} trials{}",
        display::human_size(*max_bytes),
        smallest_bytes
            .map(|bytes| format!(", the smallest one was {}", display::human_size(bytes)))
            .unwrap_or_default()
    )]
    SizeBudgetUnreachable {
        max_bytes: u64,
        smallest_bytes: Option<u64>,
        trials: usize,
    },

    #[error("couldn't write the artifact to {path}")]
    WriteError {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the job was cancelled")]
    Cancelled,
}

impl JobError {
    pub(crate) fn probe(err: anyhow::Error) -> Self {
        Self::Probe(err.into())
    }

    pub(crate) fn encode_failure(err: anyhow::Error) -> Self {
        Self::EncodeFailure(err.into())
    }
}
