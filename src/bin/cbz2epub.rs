//! CLI binary for cbz2epub.
//!
//! A thin shim over the library crate: resolves the input into jobs, runs the
//! batch with a progress bar and prints one summary line per archive. Exits 0
//! when every archive converted, 1 when at least one failed, 2 when nothing
//! could be started.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use cbz2epub::converter::ResultCallback;
use cbz2epub::types::{DEFAULT_MAX_HEIGHT, DEFAULT_QUALITY};
use cbz2epub::{
    BatchReport, ConversionOptions, ConversionResult, Converter, Direction, discover_jobs,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Convert CBZ comic archives into EPUB packages, one image per page.
#[derive(Parser, Debug)]
#[command(name = "cbz2epub", version, about)]
struct Cli {
    /// A .cbz file, or a directory searched recursively for .cbz files
    input: PathBuf,

    /// Directory receiving the .epub files; input sub-directories are mirrored
    output: PathBuf,

    /// JPEG quality of the embedded pages (1-100)
    #[arg(long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Pages taller than this many pixels are scaled down
    #[arg(long, default_value_t = DEFAULT_MAX_HEIGHT, value_parser = clap::value_parser!(u32).range(1..))]
    max_height: u32,

    /// Language tag written into every package
    #[arg(long, default_value = "en")]
    language: String,

    /// Mark packages as right-to-left (manga) reading order
    #[arg(long)]
    rtl: bool,

    /// Author written into every package
    #[arg(long)]
    author: Option<String>,

    /// Archives converted in parallel (defaults to the number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

fn summary_line(result: &ConversionResult) -> String {
    if result.success {
        let skipped = if result.pages_skipped > 0 {
            dim(&format!(", {} skipped", result.pages_skipped))
        } else {
            String::new()
        };
        format!(
            "{} {} -> {} ({} pages{})",
            green("✓"),
            result.input.display(),
            result.output.display(),
            result.pages_converted,
            skipped
        )
    } else {
        let kind = result
            .error
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        format!(
            "{} {}: {} {}",
            red("✗"),
            result.input.display(),
            kind,
            dim(result.message.as_deref().unwrap_or(""))
        )
    }
}

async fn run(cli: Cli) -> Result<BatchReport> {
    let mut builder = Converter::builder();
    builder.language(cli.language).reading_direction(if cli.rtl {
        Direction::Rtl
    } else {
        Direction::Ltr
    });
    if let Some(author) = cli.author {
        builder.creator(author);
    }
    if let Some(jobs) = cli.jobs {
        builder.max_concurrent(jobs);
    }
    let converter = builder.build().context("Invalid converter settings")?;

    let jobs = discover_jobs(&cli.input, &cli.output, converter.writer.extension())
        .await
        .with_context(|| format!("Cannot read input {:?}", cli.input))?;
    if jobs.is_empty() {
        bail!("No .cbz archives found in {:?}", cli.input);
    }

    let bar = ProgressBar::new(jobs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.green/238}] {pos}/{len} archives  ⏱ {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let callback_bar = bar.clone();
    let on_result: ResultCallback = Arc::new(move |result: &ConversionResult| {
        callback_bar.println(summary_line(result));
        callback_bar.inc(1);
    });

    let report = converter
        .convert_batch_with_callback(
            jobs,
            ConversionOptions::new(cli.quality, cli.max_height),
            Some(on_result),
        )
        .await;
    bar.finish_and_clear();

    let failed = report.failed().count();
    let succeeded = report.results.len() - failed;
    if failed == 0 {
        println!("{}", green(&format!("Converted {succeeded} archive(s)")));
    } else {
        println!(
            "{}",
            red(&format!("Converted {succeeded} archive(s), {failed} failed"))
        );
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) if report.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            ExitCode::from(2)
        }
    }
}
