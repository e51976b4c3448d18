//! Path utilities for archive entry names and output locations.
//!
//! Archive entries are addressed by `/`-separated names regardless of the host
//! platform, so the entry helpers here work on `&str`. The filesystem helpers
//! derive package titles and mirror input trees into an output root.

use std::path::{Path, PathBuf};

/// Title used when a path carries no usable file stem.
const UNTITLED: &str = "Untitled";

/// Resource-fork directory macOS adds to zip archives.
const MACOS_RESOURCE_DIR: &str = "__MACOSX";

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Derives a package title from an input file's base name without extension.
///
/// # Arguments
///
/// * `path` - The input archive path
///
/// # Returns
///
/// * `String` - The file stem, or `"Untitled"` when the path has none
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Returns the lower-cased extension of an archive entry name.
pub fn entry_extension(name: &str) -> Option<String> {
    let file_name = name.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Checks whether any component of an archive entry name is hidden.
///
/// Dot-prefixed components (`.DS_Store`, `._001.jpg`) and the macOS
/// `__MACOSX` resource-fork tree never hold real pages.
pub fn is_hidden_entry(name: &str) -> bool {
    name.split('/')
        .filter(|component| !component.is_empty())
        .any(|component| component.starts_with('.') || component == MACOS_RESOURCE_DIR)
}

/// Checks if a filename starts with a dot (hidden file).
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Places `input` under `output_root`, keeping its directory relative to
/// `input_root` and swapping its extension for `extension`.
///
/// # Arguments
///
/// * `input_root` - Root of the scanned input tree
/// * `input` - A file somewhere below `input_root`
/// * `output_root` - Root of the output tree
/// * `extension` - Extension of the produced file, without dot
///
/// # Returns
///
/// * `PathBuf` - e.g. `in/a/b.cbz` under `in` becomes `out/a/b.epub`
pub fn mirrored_output_path(
    input_root: &Path,
    input: &Path,
    output_root: &Path,
    extension: &str,
) -> PathBuf {
    let relative_dir = input
        .parent()
        .and_then(|parent| parent.strip_prefix(input_root).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut file_name = title_from_path(input);
    file_name.push('.');
    file_name.push_str(extension);

    output_root.join(relative_dir).join(file_name)
}
