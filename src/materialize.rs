//! Persisting artifacts without ever exposing a partially written file.

use crate::error::JobError;
use crate::prelude::*;
use crate::profile::ConstraintProfile;
use tempfile::TempPath;

/// Deterministic destination of an artifact, so that re-running a job on the
/// same input overwrites the previous output instead of piling up copies.
pub fn output_path(
    output_dir: &Utf8Path,
    source_stem: &str,
    profile: &ConstraintProfile,
) -> Utf8PathBuf {
    output_dir.join(format!(
        "{source_stem}-{}.{}",
        profile.class.file_suffix(),
        profile.container.extension()
    ))
}

/// Bytes written to a temporary file in the destination directory.
/// Dropping it without [`StagedArtifact::commit`] removes the file.
#[derive(Debug)]
pub struct StagedArtifact {
    temp: TempPath,
    path: Utf8PathBuf,
    destination: Utf8PathBuf,
}

impl StagedArtifact {
    /// Location of the staged file. It keeps the destination's extension,
    /// so the codec engine can probe it.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Atomically renames the staged file to its destination, replacing the
    /// previous artifact if there is one.
    pub fn commit(self) -> Result<Utf8PathBuf, JobError> {
        let destination = self.destination;

        match self.temp.persist(&destination) {
            Ok(()) => Ok(destination),
            Err(err) => Err(JobError::WriteError {
                path: destination,
                source: err.error,
            }),
        }
    }
}

pub async fn stage(bytes: &[u8], destination: &Utf8Path) -> Result<StagedArtifact, JobError> {
    let write_error = |source: std::io::Error| JobError::WriteError {
        path: destination.to_owned(),
        source,
    };

    let dir = destination
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    fs::create_dir_all(dir).await.map_err(write_error)?;

    let file_name = destination.file_name().unwrap_or("artifact");
    let suffix = destination
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let temp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(write_error)?
        .into_temp_path();

    fs::write(&temp, bytes).await.map_err(write_error)?;

    let path = temp.unwrap_utf8().to_owned();

    debug!(%path, size = %crate::display::human_size(bytes.len()), "Staged the artifact");

    Ok(StagedArtifact {
        temp,
        path,
        destination: destination.to_owned(),
    })
}

/// Writes `bytes` to `destination` via a temporary file and a rename.
pub async fn write(bytes: &[u8], destination: &Utf8Path) -> Result<Utf8PathBuf, JobError> {
    stage(bytes, destination).await?.commit()
}
