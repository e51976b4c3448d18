//! Core data types, enums, and reports for the cbz2epub conversion library.
//!
//! This module defines the value types shared by every pipeline stage:
//! - Per-call options (`ConversionOptions`)
//! - Batch inputs and outputs (`ConversionJob`, `ConversionResult`, `BatchReport`)
//! - Enumerations (`Direction`, `ErrorKind`)

use std::fmt;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default JPEG quality applied to every page.
pub const DEFAULT_QUALITY: u8 = 80;
/// Default maximum page height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 1024;

/// Page progression direction of the generated package.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ltr => f.write_str("ltr"),
            Direction::Rtl => f.write_str("rtl"),
        }
    }
}

/// Coarse failure category reported for one input file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    ArchiveUnreadable,
    ImageDecodeError,
    PackageWriteError,
    EmptyArchive,
    InvalidOptions,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ArchiveUnreadable => "ArchiveUnreadable",
            ErrorKind::ImageDecodeError => "ImageDecodeError",
            ErrorKind::PackageWriteError => "PackageWriteError",
            ErrorKind::EmptyArchive => "EmptyArchive",
            ErrorKind::InvalidOptions => "InvalidOptions",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// Scalar options handed explicitly to every conversion call.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// JPEG quality, 1 (smallest) to 100 (near-lossless).
    pub quality: u8,
    /// Pages taller than this are downscaled to exactly this height.
    pub max_height: u32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl ConversionOptions {
    pub fn new(quality: u8, max_height: u32) -> Self {
        Self {
            quality,
            max_height,
        }
    }

    /// Rejects a quality outside 1..=100 or a zero max height.
    pub fn validate(&self) -> Result<&Self> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidOptions(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self.max_height == 0 {
            return Err(Error::InvalidOptions(
                "max_height must be a positive number of pixels".to_string(),
            ));
        }
        Ok(self)
    }
}

/// One resolved (input archive, output package) pair.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Outcome of converting a single archive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub success: bool,
    pub error: Option<ErrorKind>,
    /// Human-readable reason, set whenever `error` is.
    pub message: Option<String>,
    pub pages_converted: usize,
    /// Image entries skipped because they could not be decoded.
    pub pages_skipped: usize,
}

impl ConversionResult {
    pub fn succeeded(job: &ConversionJob, pages_converted: usize, pages_skipped: usize) -> Self {
        Self {
            input: job.input.clone(),
            output: job.output.clone(),
            success: true,
            error: None,
            message: None,
            pages_converted,
            pages_skipped,
        }
    }

    pub fn failed(job: &ConversionJob, error: &Error) -> Self {
        Self {
            input: job.input.clone(),
            output: job.output.clone(),
            success: false,
            error: Some(error.kind()),
            message: Some(error.to_string()),
            pages_converted: 0,
            pages_skipped: 0,
        }
    }
}

/// Results of a batch run, in job order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<ConversionResult>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
