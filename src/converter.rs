use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use crate::archive::{ImageEntry, SourceArchive};
use crate::error::{Error, Result};
use crate::generator::epub::EpubWriter;
use crate::generator::{EbookPackage, PackageWriter, assemble, render_page};
use crate::path_utils::title_from_path;
use crate::transform::{ImageCodec, JpegCodec, transform};
use crate::types::{BatchReport, ConversionJob, ConversionOptions, ConversionResult, Direction};

/// Callback invoked once per finished file during a batch run.
pub type ResultCallback = Arc<dyn Fn(&ConversionResult) + Send + Sync + 'static>;

/// The archive-to-ebook converter, built declaratively using the builder pattern.
///
/// A `Converter` only holds package-level settings and its codec and writer
/// collaborators. Per-call options (quality, max height) are passed
/// explicitly to every conversion, so one converter can serve many jobs
/// concurrently.
///
/// - [`convert_one`](Converter::convert_one): one archive, on the blocking pool
/// - [`convert_one_blocking`](Converter::convert_one_blocking): one archive, on the current thread
/// - [`convert_batch`](Converter::convert_batch): many archives, bounded concurrency
///
/// ```rust,no_run
/// # use cbz2epub::prelude::*;
/// # #[tokio::main]
/// # async fn main() -> cbz2epub::error::Result<()> {
/// let converter = Converter::builder()
///     .language("ja")
///     .reading_direction(Direction::Rtl)
///     .build()?;
///
/// let result = converter
///     .convert_one(Path::new("issue01.cbz"), Path::new("out/issue01.epub"), 80, 1024)
///     .await;
/// println!("{} pages", result.pages_converted);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Converter {
    /// Language tag written into the package metadata.
    #[builder(setter(into), default = "\"en\".to_string()")]
    pub language: String,

    /// Page progression direction of the generated packages.
    #[builder(default = "Direction::Ltr")]
    pub reading_direction: Direction,

    /// Optional author/creator written into the package metadata.
    #[builder(setter(into, strip_option), default)]
    pub creator: Option<String>,

    /// Upper bound on archives converted at the same time by [`Converter::convert_batch`].
    ///
    /// Image transformation is CPU-bound, so this defaults to the number of CPUs.
    #[builder(default = "num_cpus::get()")]
    pub max_concurrent: usize,

    /// Codec used to decode source pages and encode output pages.
    #[builder(default = "Arc::new(JpegCodec) as Arc<dyn ImageCodec>")]
    pub codec: Arc<dyn ImageCodec>,

    /// Writer that serialises assembled packages.
    #[builder(default = "Arc::new(EpubWriter) as Arc<dyn PackageWriter>")]
    pub writer: Arc<dyn PackageWriter>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("language", &self.language)
            .field("reading_direction", &self.reading_direction)
            .field("creator", &self.creator)
            .field("max_concurrent", &self.max_concurrent)
            .field("codec", &self.codec.media_type())
            .field("writer", &self.writer.extension())
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            reading_direction: Direction::Ltr,
            creator: None,
            max_concurrent: num_cpus::get(),
            codec: Arc::new(JpegCodec),
            writer: Arc::new(EpubWriter),
        }
    }
}

/// Page counts of a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageCounts {
    converted: usize,
    skipped: usize,
}

impl Converter {
    /// Creates a new builder for configuring a `Converter`.
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// Converts one archive on the current thread.
    ///
    /// Never fails: every error is folded into the returned
    /// [`ConversionResult`]. On failure nothing is written to `output`.
    ///
    /// # Arguments
    ///
    /// * `input` - Source comic archive
    /// * `output` - Destination package path
    /// * `quality` - Encoder quality, 1-100
    /// * `max_height` - Page height limit in pixels
    pub fn convert_one_blocking(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
        max_height: u32,
    ) -> ConversionResult {
        let job = ConversionJob::new(input, output);
        let options = ConversionOptions::new(quality, max_height);

        match self.run(&job, options) {
            Ok(counts) => {
                info!(
                    "Converted {:?} -> {:?} ({} pages, {} skipped)",
                    job.input, job.output, counts.converted, counts.skipped
                );
                ConversionResult::succeeded(&job, counts.converted, counts.skipped)
            }
            Err(e) => {
                warn!("Failed to convert {:?}: {}", job.input, e);
                ConversionResult::failed(&job, &e)
            }
        }
    }

    /// Converts one archive on tokio's blocking pool.
    ///
    /// Same contract as [`Converter::convert_one_blocking`].
    pub async fn convert_one(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
        max_height: u32,
    ) -> ConversionResult {
        let job = ConversionJob::new(input, output);
        let converter = self.clone();
        let task_job = job.clone();

        spawn_blocking(move || {
            converter.convert_one_blocking(&task_job.input, &task_job.output, quality, max_height)
        })
        .await
        .unwrap_or_else(|e| ConversionResult::failed(&job, &Error::Join(e)))
    }

    /// Converts every job, at most [`Converter::max_concurrent`] at a time.
    ///
    /// A failing file never stops the others. Results come back in job order.
    pub async fn convert_batch(
        &self,
        jobs: Vec<ConversionJob>,
        options: ConversionOptions,
    ) -> BatchReport {
        self.convert_batch_with_callback(jobs, options, None).await
    }

    /// Like [`Converter::convert_batch`], calling `on_result` as each file finishes.
    pub async fn convert_batch_with_callback(
        &self,
        jobs: Vec<ConversionJob>,
        options: ConversionOptions,
        on_result: Option<ResultCallback>,
    ) -> BatchReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.max(1)));

        let tasks: Vec<_> = jobs
            .iter()
            .cloned()
            .map(|job| {
                let semaphore = Arc::clone(&semaphore);
                let converter = self.clone();
                let on_result = on_result.clone();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await?;
                    let result = converter
                        .convert_one(&job.input, &job.output, options.quality, options.max_height)
                        .await;
                    if let Some(callback) = on_result.as_ref() {
                        callback(&result);
                    }
                    Result::Ok(result)
                })
            })
            .collect();

        let results = join_all(tasks)
            .await
            .into_iter()
            .zip(jobs.iter())
            .map(|(outcome, job)| match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => ConversionResult::failed(job, &e),
                Err(e) => ConversionResult::failed(job, &Error::Join(e)),
            })
            .collect();

        BatchReport { results }
    }

    /// Open -> list -> transform and render each page -> assemble.
    fn run(&self, job: &ConversionJob, options: ConversionOptions) -> Result<PageCounts> {
        options.validate()?;

        let title = title_from_path(&job.input);
        let mut archive = SourceArchive::open(&job.input)?;
        let entries = archive.list_images();
        if entries.is_empty() {
            return Err(Error::EmptyArchive(job.input.clone()));
        }

        let mut pages = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        let mut last_error = None;

        for entry in &entries {
            let position = pages.len();
            let converted = archive.read_entry(entry).and_then(|raw| {
                transform(
                    self.codec.as_ref(),
                    &raw,
                    position,
                    options.max_height,
                    options.quality,
                )
            });

            match converted {
                Ok(image) => pages.push(render_page(position, image)),
                Err(e) => {
                    let e = decode_error(entry, e);
                    warn!("Skipping {}", e);
                    skipped += 1;
                    last_error = Some(e);
                }
            }
        }
        drop(archive);

        if pages.is_empty() {
            return Err(last_error.unwrap_or_else(|| Error::EmptyArchive(job.input.clone())));
        }

        let package = EbookPackage::new(title, self.language.clone(), pages)
            .with_direction(self.reading_direction)
            .with_creator(self.creator.clone());
        assemble(self.writer.as_ref(), &package, &job.output)?;

        Ok(PageCounts {
            converted: package.pages.len(),
            skipped,
        })
    }
}

/// Attributes a per-page failure to its archive entry.
fn decode_error(entry: &ImageEntry, error: Error) -> Error {
    match error {
        Error::ImageDecode { .. } => error,
        other => Error::ImageDecode {
            entry: entry.name.clone(),
            reason: other.to_string(),
        },
    }
}

impl ConverterBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(language) = &self.language {
            if language.trim().is_empty() {
                return Err("Language must not be empty.".to_string());
            }
        }
        if let Some(max_concurrent) = self.max_concurrent {
            if max_concurrent == 0 {
                return Err("max_concurrent must be at least 1.".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let converter = Converter::builder().build().unwrap();
        assert_eq!(converter.language, "en");
        assert_eq!(converter.reading_direction, Direction::Ltr);
        assert!(converter.creator.is_none());
        assert!(converter.max_concurrent >= 1);
        assert_eq!(converter.codec.media_type(), "image/jpeg");
        assert_eq!(converter.writer.extension(), "epub");
    }

    #[test]
    fn test_builder_validation() {
        let err = Converter::builder().language("  ").build().unwrap_err();
        assert!(err.to_string().contains("Language must not be empty"));

        let err = Converter::builder().max_concurrent(0usize).build().unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));

        let converter = Converter::builder()
            .language("ja")
            .creator("Mangaka")
            .reading_direction(Direction::Rtl)
            .max_concurrent(2usize)
            .build()
            .unwrap();
        assert_eq!(converter.creator.as_deref(), Some("Mangaka"));
        assert_eq!(converter.max_concurrent, 2);
    }

    #[test]
    fn test_decode_error_names_entry() {
        let entry = ImageEntry {
            name: "ch1/004.png".to_string(),
            archive_index: 3,
            position: 3,
        };
        let err = decode_error(&entry, Error::from("bad header"));
        match err {
            Error::ImageDecode { entry, reason } => {
                assert_eq!(entry, "ch1/004.png");
                assert!(reason.contains("bad header"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
