//! Page rendering and package assembly.
//!
//! Pages are rendered into an in-memory [`EbookPackage`], which a
//! [`PackageWriter`] serialises. [`assemble`] owns the output file: it writes
//! to a temporary sibling and renames it into place only once the writer has
//! finished, so an interrupted run never leaves a partial package behind.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::types::Direction;

pub mod epub;
pub mod page;

pub use page::{Page, render_page};

/// Package directory holding page images.
pub const IMAGE_DIR: &str = "images";
/// Package directory holding page markup.
pub const PAGE_DIR: &str = "pages";
/// Zero-padding width of page numbers in resource names.
pub const PAGE_NUMBER_WIDTH: usize = 5;

/// Shared stem of a page's markup and image names, e.g. `page_00001`.
///
/// `position` is 0-based; names are 1-based and zero-padded so that
/// lexicographic order equals reading order.
pub fn page_stem(position: usize) -> String {
    format!("page_{:0width$}", position + 1, width = PAGE_NUMBER_WIDTH)
}

/// Everything needed to write one ebook.
#[derive(Debug, Clone)]
pub struct EbookPackage {
    pub title: String,
    pub language: String,
    pub direction: Direction,
    pub creator: Option<String>,
    /// Pages in spine order.
    pub pages: Vec<Page>,
}

impl EbookPackage {
    pub fn new(title: impl Into<String>, language: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            title: title.into(),
            language: language.into(),
            direction: Direction::default(),
            creator: None,
            pages,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_creator(mut self, creator: Option<String>) -> Self {
        self.creator = creator;
        self
    }

    /// Checks the one-page-one-resource invariant.
    ///
    /// Every page must reference its own image, and no two pages may share a
    /// markup or image name.
    pub fn check_references(&self) -> Result<()> {
        if self.pages.is_empty() {
            return Err(Error::Other(format!("Package '{}' has no pages", self.title)));
        }

        let mut hrefs = HashSet::new();
        for page in &self.pages {
            if !page.markup.contains(&page.image_src()) {
                return Err(Error::Other(format!(
                    "{} does not reference {}",
                    page.href(),
                    page.image_href()
                )));
            }
            if !hrefs.insert(page.href()) || !hrefs.insert(page.image_href()) {
                return Err(Error::Other(format!(
                    "Duplicate resource name for page {}",
                    page.index + 1
                )));
            }
        }
        Ok(())
    }
}

/// Serialises an [`EbookPackage`] into a byte sink.
pub trait PackageWriter: Send + Sync {
    fn write(&self, package: &EbookPackage, sink: &mut dyn Write) -> Result<()>;

    /// Extension of the produced files, without dot.
    fn extension(&self) -> &'static str {
        "epub"
    }
}

/// Writes `package` to `destination` through `writer`, atomically.
///
/// Missing parent directories are created. Any failure, including a writer
/// error, is reported as [`Error::PackageWrite`] and leaves `destination`
/// untouched.
pub fn assemble(writer: &dyn PackageWriter, package: &EbookPackage, destination: &Path) -> Result<()> {
    package.check_references()?;

    let write_error = |reason: String| Error::PackageWrite(destination.to_path_buf(), reason);

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;

    let mut staging = tempfile::Builder::new()
        .prefix(".cbz2epub-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| write_error(e.to_string()))?;

    writer
        .write(package, staging.as_file_mut())
        .map_err(|e| write_error(e.to_string()))?;
    staging
        .as_file()
        .sync_all()
        .map_err(|e| write_error(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(|e| write_error(e.to_string()))?;
    }

    staging
        .persist(destination)
        .map_err(|e| write_error(e.error.to_string()))?;

    debug!(
        "Wrote '{}' ({} pages) to {:?}",
        package.title,
        package.pages.len(),
        destination
    );
    Ok(())
}
