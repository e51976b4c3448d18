//! Custom error types and result handling for cbz2epub operations.
//!
//! Every fallible operation returns a [`Result<T>`], a type alias for
//! `std::result::Result<T, Error>`. The orchestrator never lets an [`Error`]
//! escape a single file's conversion: it is folded into a
//! [`ConversionResult`](crate::types::ConversionResult) via [`Error::kind`].
//!
use std::path::PathBuf;

use crate::types::ErrorKind;

/// Type alias for Results with cbz2epub errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all cbz2epub operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image processing errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// EPUB generation errors
    #[error(transparent)]
    Epub(#[from] epub_builder::Error),
    /// ZIP file operation errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    ConverterBuilder(#[from] crate::converter::ConverterBuilderError),
    /// The source archive is missing, not a zip container, encrypted or corrupt
    #[error("Cannot read archive '{0:?}': {1}")]
    ArchiveUnreadable(PathBuf, String),
    /// A single archive entry could not be decoded as an image
    #[error("Cannot decode image '{entry}': {reason}")]
    ImageDecode { entry: String, reason: String },
    /// The archive holds no image entries at all
    #[error("Archive '{0:?}' contains no images")]
    EmptyArchive(PathBuf),
    /// The output package could not be written
    #[error("Cannot write package '{0:?}': {1}")]
    PackageWrite(PathBuf, String),
    /// Quality, max-height or other scalar options out of range
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Maps the error onto the coarse kind reported per file.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ArchiveUnreadable(..) | Error::Zip(_) => ErrorKind::ArchiveUnreadable,
            Error::ImageDecode { .. } | Error::Image(_) => ErrorKind::ImageDecodeError,
            Error::EmptyArchive(_) => ErrorKind::EmptyArchive,
            Error::PackageWrite(..) | Error::Epub(_) => ErrorKind::PackageWriteError,
            Error::InvalidOptions(_) | Error::ConverterBuilder(_) | Error::InvalidPath(..) => {
                ErrorKind::InvalidOptions
            }
            Error::Io(_)
            | Error::Join(_)
            | Error::Semaphore(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
