use crate::prelude::*;
use crate::util::path::Utf8StemmedPathBuf;
use futures::prelude::*;

/// Returns either the files in the directory (not recursively, sorted by
/// name, hidden ones skipped) or the single file the path points to.
///
/// A path that can't be stat'ed is returned as is. Its job then fails to
/// probe it, and the rest of the batch goes on.
pub(crate) async fn files(path: impl AsRef<Utf8Path>) -> Result<Vec<Utf8PathBuf>> {
    let path = path.as_ref();

    let is_dir = match fs::metadata(path).await {
        Ok(meta) => meta.is_dir(),
        Err(err) => {
            debug!(%path, err = &err as &dyn std::error::Error, "Can't stat the input");
            false
        }
    };

    if !is_dir {
        return Ok(vec![path.to_owned()]);
    }

    let dir = fs::read_dir(path).await?;

    let mut files: Vec<Utf8PathBuf> = read_dir_stream(dir)
        .try_filter_map(|entry| async move {
            if !entry.file_type().await?.is_file() {
                return Ok(None);
            }
            let path = Utf8PathBuf::try_from(entry.path())?;
            let hidden = path.file_name().is_some_and(|name| name.starts_with('.'));
            Ok::<_, anyhow::Error>((!hidden).then_some(path))
        })
        .try_collect()
        .await?;

    files.sort();

    Ok(files)
}

fn read_dir_stream(dir: fs::ReadDir) -> impl futures::Stream<Item = Result<fs::DirEntry>> {
    stream::unfold(dir, |mut dir| async move {
        dir.next_entry()
            .err_into()
            .await
            .transpose()
            .map(|entry| (entry, dir))
    })
}

pub(crate) fn validate_duplicate_input_names<'a>(
    inputs: impl IntoIterator<Item = &'a Utf8StemmedPathBuf>,
) -> Result {
    let mut duplicates = inputs
        .into_iter()
        .into_group_map_by(|path| path.file_stem())
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        // Sort to make the test snapshots stable
        .sorted_by_key(|(stem, _)| *stem)
        .peekable();

    if duplicates.peek().is_none() {
        return Ok(());
    }

    let inputs = duplicates.format_with("\n", |(stem, contexts), f| {
        let paths = contexts.iter().map(|path| path.as_path()).format(", ");
        let len = contexts.len();
        f(&format_args!("- {stem} ({len} files): [{paths}]"))
    });

    bail!("The following input files have the same name, but they must be unique.\n{inputs}");
}
