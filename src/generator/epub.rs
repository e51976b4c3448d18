use std::io::{Cursor, Write};

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ZipLibrary};

use crate::error::Result;
use crate::generator::{EbookPackage, PackageWriter};
use crate::types::Direction;

/// EPUB 3 writer backed by `epub-builder`.
///
/// `epub-builder` emits the uncompressed `mimetype` entry first, the
/// `META-INF/container.xml` descriptor, the OPF manifest and spine, and the
/// navigation documents. Each page contributes one markup document and one
/// image resource, added in spine order. The package identifier is a fresh
/// UUID on every run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubWriter;

impl PackageWriter for EpubWriter {
    fn write(&self, package: &EbookPackage, sink: &mut dyn Write) -> Result<()> {
        let mut epub = EpubBuilder::new(ZipLibrary::new()?)?;

        epub.epub_version(EpubVersion::V30);

        epub.stylesheet(include_bytes!("../../templates/Page.css").as_slice())?;

        epub.metadata("title", &package.title)?;
        epub.metadata("lang", &package.language)?;
        if let Some(creator) = &package.creator {
            epub.metadata("author", creator)?;
        }
        // Left-to-right is the reader default; only the opposite needs declaring.
        if package.direction != Direction::Ltr {
            epub.metadata("direction", package.direction.to_string())?;
        }

        for page in &package.pages {
            epub.add_resource(
                page.image_href(),
                Cursor::new(page.image.data.as_slice()),
                page.image.media_type,
            )?;
            epub.add_content(
                EpubContent::new(page.href(), page.markup.as_bytes()).title(&page.title),
            )?;
        }

        epub.generate(sink)?;
        Ok(())
    }
}
