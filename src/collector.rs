//! Discovery of conversion jobs on disk.
//!
//! Turns a user-supplied input (a single archive or a directory tree of
//! archives) into resolved [`ConversionJob`]s whose outputs mirror the input
//! layout under an output root.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tokio::fs::{self, read_dir};

use crate::archive::natural_cmp;
use crate::error::{Error, Result};
use crate::path_utils::{is_hidden_file, mirrored_output_path, path_to_string_lossy};
use crate::types::ConversionJob;

/// Extension of the comic archives picked up from directories.
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Resolves `input` into conversion jobs.
///
/// # Arguments
///
/// * `input` - A single archive, or a directory scanned recursively for archives
/// * `output_root` - Directory that receives the packages
/// * `extension` - Extension of the produced packages, without dot
///
/// # Returns
///
/// * `Ok(Vec<ConversionJob>)` - Jobs in natural path order; empty if the
///   directory holds no archives
/// * `Err(Error::InvalidPath)` - `input` does not exist or cannot be read
pub async fn discover_jobs(
    input: &Path,
    output_root: &Path,
    extension: &str,
) -> Result<Vec<ConversionJob>> {
    let metadata = fs::metadata(input)
        .await
        .map_err(|e| Error::InvalidPath(input.to_path_buf(), e.to_string()))?;

    if !metadata.is_dir() {
        let input_root = input.parent().unwrap_or_else(|| Path::new(""));
        let output = mirrored_output_path(input_root, input, output_root, extension);
        return Ok(vec![ConversionJob::new(input, output)]);
    }

    let mut archives = collect_archives(input).await?;
    archives.par_sort_by(|a, b| natural_cmp(&path_to_string_lossy(a), &path_to_string_lossy(b)));

    Ok(archives
        .into_iter()
        .map(|archive| {
            let output = mirrored_output_path(input, &archive, output_root, extension);
            ConversionJob::new(archive, output)
        })
        .collect())
}

/// Walks `root` and returns every non-hidden archive below it.
///
/// Symlinked directories are not followed.
async fn collect_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(directory) = pending.pop() {
        let mut entries = read_dir(&directory)
            .await
            .map_err(|e| Error::InvalidPath(directory.clone(), e.to_string()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_hidden_file(&path) {
                continue;
            }

            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if is_archive(&path) {
                archives.push(path);
            }
        }
    }

    Ok(archives)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
