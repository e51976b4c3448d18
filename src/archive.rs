//! Comic archive reading and page ordering.
//!
//! A [`SourceArchive`] is a memory-mapped zip container. Listing it yields the
//! image entries in natural reading order, independent of the order in which
//! the archive happens to store them. Entry bytes are only read on demand.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use memmap2::{Mmap, MmapOptions};
use rayon::prelude::*;
use regex::Regex;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::path_utils::{entry_extension, is_hidden_entry};

/// Extensions recognised as comic pages, lower-case.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: u64 = 64 << 20;

lazy_static! {
    /// Splits a name into alternating runs of ASCII digits and everything else.
    static ref NATURAL_CHUNK_REGEX: Regex = Regex::new(r"[0-9]+|[^0-9]+").unwrap();
}

/// One image inside a [`SourceArchive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Full entry path inside the archive, e.g. `chapter1/002.jpg`.
    pub name: String,
    /// Position of the entry in the zip central directory.
    pub archive_index: usize,
    /// 0-based reading position after natural sorting.
    pub position: usize,
}

/// An opened comic archive.
pub struct SourceArchive {
    path: PathBuf,
    zip: ZipArchive<Cursor<Mmap>>,
}

impl std::fmt::Debug for SourceArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceArchive")
            .field("path", &self.path)
            .field("entries", &self.zip.len())
            .finish()
    }
}

impl SourceArchive {
    /// Opens and memory-maps the archive at `path`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::ArchiveUnreadable)` - The path is missing, is not a zip
    ///   container, or holds encrypted entries
    pub fn open(path: &Path) -> Result<Self> {
        let unreadable = |reason: String| Error::ArchiveUnreadable(path.to_path_buf(), reason);

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        // The map is read-only and lives exactly as long as the archive.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| unreadable(e.to_string()))?;
        let mut zip = ZipArchive::new(Cursor::new(mmap)).map_err(|e| unreadable(e.to_string()))?;

        for index in 0..zip.len() {
            let entry = zip
                .by_index_raw(index)
                .map_err(|e| unreadable(e.to_string()))?;
            if entry.encrypted() {
                return Err(unreadable(format!("entry '{}' is encrypted", entry.name())));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of raw entries, including directories and non-images.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Lists the image entries in natural reading order.
    ///
    /// Directories, hidden entries and files outside [`IMAGE_EXTENSIONS`] are
    /// dropped. An archive without images yields an empty vector.
    pub fn list_images(&self) -> Vec<ImageEntry> {
        let mut entries: Vec<ImageEntry> = (0..self.zip.len())
            .filter_map(|index| {
                let name = self.zip.name_for_index(index)?;
                is_image_entry(name).then(|| ImageEntry {
                    name: name.to_string(),
                    archive_index: index,
                    position: 0,
                })
            })
            .collect();

        entries.par_sort_by(|a, b| natural_cmp(&a.name, &b.name));
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.position = position;
        }
        entries
    }

    /// Reads the raw bytes of one entry.
    ///
    /// A damaged entry surfaces as [`Error::ImageDecode`] so callers can skip
    /// it like any other undecodable page.
    pub fn read_entry(&mut self, entry: &ImageEntry) -> Result<Vec<u8>> {
        let decode_error = |reason: String| Error::ImageDecode {
            entry: entry.name.clone(),
            reason,
        };

        let mut file = self
            .zip
            .by_index(entry.archive_index)
            .map_err(|e| decode_error(e.to_string()))?;
        let mut bytes = Vec::with_capacity(preallocation_hint(file.size()));
        file.read_to_end(&mut bytes)
            .map_err(|e| decode_error(e.to_string()))?;
        Ok(bytes)
    }
}

/// Buffer size reserved for an entry whose header declares `declared` bytes.
///
/// Header sizes are untrusted; the buffer still grows past the bound on read.
fn preallocation_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

fn is_image_entry(name: &str) -> bool {
    if name.ends_with('/') || is_hidden_entry(name) {
        return false;
    }
    entry_extension(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Compares two names treating embedded digit runs as numbers.
///
/// `page2` sorts before `page10`, text runs compare case-insensitively, and
/// digit runs sort before text runs at the same position. Names that only
/// differ in leading zeros or case fall back to byte order, so the ordering
/// is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = NATURAL_CHUNK_REGEX.find_iter(a);
    let mut right = NATURAL_CHUNK_REGEX.find_iter(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let order = compare_chunks(l.as_str(), r.as_str());
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

fn compare_chunks(left: &str, right: &str) -> Ordering {
    let is_number = |s: &str| s.starts_with(|c: char| c.is_ascii_digit());

    match (is_number(left), is_number(right)) {
        (true, true) => {
            // Compare by significant digits so arbitrarily long runs never overflow.
            let l = left.trim_start_matches('0');
            let r = right.trim_start_matches('0');
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        }
        (false, false) => left.to_lowercase().cmp(&right.to_lowercase()),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn test_numeric_runs_compare_as_numbers() {
        assert_eq!(natural_cmp("page2", "page10"), Ordering::Less);
        assert_eq!(natural_cmp("page10", "page2"), Ordering::Greater);
        assert_eq!(
            sorted(&["003.jpg", "001.png", "002.jpg"]),
            vec!["001.png", "002.jpg", "003.jpg"]
        );
        assert_eq!(
            sorted(&["p10.jpg", "p9.jpg", "p100.jpg", "p1.jpg"]),
            vec!["p1.jpg", "p9.jpg", "p10.jpg", "p100.jpg"]
        );
    }

    #[test]
    fn test_mixed_alphanumeric_names() {
        assert_eq!(
            sorted(&[
                "Chapter 10/page_1.jpg",
                "chapter 2/page_10.jpg",
                "Chapter 2/page_9.jpg",
                "cover.jpg",
                "000.jpg",
            ]),
            vec![
                "000.jpg",
                "Chapter 2/page_9.jpg",
                "chapter 2/page_10.jpg",
                "Chapter 10/page_1.jpg",
                "cover.jpg",
            ]
        );
    }

    #[test]
    fn test_leading_zeros_and_long_runs() {
        assert_eq!(natural_cmp("007", "7"), Ordering::Less);
        assert_eq!(natural_cmp("7", "007"), Ordering::Greater);
        assert_eq!(
            natural_cmp("scan_99999999999999999999999", "scan_100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("page", "page1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_preallocation_hint_is_bounded() {
        assert_eq!(preallocation_hint(0), 0);
        assert_eq!(preallocation_hint(4096), 4096);
        assert_eq!(preallocation_hint(u64::MAX), 64 << 20);
    }

    #[test]
    fn test_is_image_entry() {
        assert!(is_image_entry("001.JPG"));
        assert!(is_image_entry("ch1/002.webp"));
        assert!(!is_image_entry("ch1/"));
        assert!(!is_image_entry("ComicInfo.xml"));
        assert!(!is_image_entry("__MACOSX/ch1/._002.jpg"));
        assert!(!is_image_entry("notes.txt"));
    }
}
