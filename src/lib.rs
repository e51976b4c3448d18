//! cbz2epub - Comic Archive to EPUB Conversion Library
//!
//! This crate converts CBZ comic archives into self-contained EPUB 3 packages
//! with one page per image. Pages are read in natural name order, flattened
//! to opaque RGB, downscaled to a height limit and re-encoded as JPEG before
//! being assembled into a package with a matching manifest and spine.
//!
//! # Getting Started
//!
//! Build a [`Converter`] once, then hand it (input, output) pairs together
//! with the per-call quality and height limit.
//!
//! ```rust,no_run
//! use cbz2epub::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> cbz2epub::error::Result<()> {
//!     let converter = Converter::builder().language("en").build()?;
//!
//!     // Resolve a directory of archives into jobs mirroring its layout
//!     let jobs = discover_jobs(Path::new("./comics"), Path::new("./ebooks"), "epub").await?;
//!
//!     let report = converter
//!         .convert_batch(jobs, ConversionOptions::new(80, 1024))
//!         .await;
//!
//!     for result in report.failed() {
//!         eprintln!("{:?}: {:?}", result.input, result.error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Decoding and package writing sit behind the [`ImageCodec`] and
//! [`PackageWriter`] traits; any implementation can be plugged into the
//! builder.

pub mod archive;
pub mod collector;
pub mod converter;
pub mod error;
pub mod generator;
pub mod path_utils;
pub mod transform;
pub mod types;

// Publicly expose the main `Converter` struct and its builder
pub use converter::{Converter, ConverterBuilder};

// Re-export the pipeline seams and core types for direct access
pub use archive::{ImageEntry, SourceArchive, natural_cmp};
pub use collector::discover_jobs;
pub use generator::epub::EpubWriter;
pub use generator::{EbookPackage, PackageWriter, Page};
pub use transform::{ImageCodec, JpegCodec, TransformedImage};
pub use types::{
    BatchReport, ConversionJob, ConversionOptions, ConversionResult, Direction, ErrorKind,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types and traits, allowing you to import
/// everything you need with a single `use cbz2epub::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        BatchReport, ConversionJob, ConversionOptions, ConversionResult, Converter,
        ConverterBuilder, Direction, EbookPackage, EpubWriter, ErrorKind, ImageCodec, JpegCodec,
        PackageWriter, Page, TransformedImage, discover_jobs, error, generator, types,
    };
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
