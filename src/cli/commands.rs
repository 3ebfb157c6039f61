//! CLI Command Implementations
//!
//! Each command builds a single-threaded tokio runtime and drives one
//! [`Converter`] session on it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::archive::ZipPackager;
use crate::category::normalize_name;
use crate::cli::{CategoryInput, Settings};
use crate::config::ConverterConfig;
use crate::error::{CategoryRejection, GameWavError, Result};
use crate::job::{SourceFile, SUPPORTED_EXTENSIONS};
use crate::scheduler::BatchReport;
use crate::workflow::Converter;

/// Resolve the configuration: file (if any), then command-line overrides
pub fn resolve_config(settings: &Settings) -> Result<ConverterConfig> {
    let mut config = match &settings.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ConverterConfig::load(path)?
        }
        None => ConverterConfig::default(),
    };
    if let Some(limit) = settings.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(pause) = settings.pause_ms {
        config.inter_batch_pause_ms = pause;
    }
    config.validate()?;
    Ok(config)
}

/// Expand files and directories into sources, directories recursively and
/// in name order
pub fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    GameWavError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
                })?;
                if entry.file_type().is_file() {
                    sources.push(SourceFile::from_path(entry.into_path()));
                }
            }
        } else if input.exists() {
            sources.push(SourceFile::from_path(input.clone()));
        } else {
            warn!("Input not found: {}", input.display());
        }
    }
    Ok(sources)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn print_failures(report: &BatchReport) {
    for record in report.jobs.iter().filter(|r| r.failure.is_some()) {
        println!(
            "  ERR {} ({})",
            record.source_name,
            record.detail.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Convert files one by one into `out_dir`
pub fn convert(inputs: &[PathBuf], out_dir: &Path, settings: &Settings) -> Result<()> {
    let config = resolve_config(settings)?;
    let converter = Converter::new(config)?;
    let sources = collect_sources(inputs)?;

    let outcome = runtime()?.block_on(converter.convert_files(sources, out_dir, |progress| {
        println!("{} {}", progress, progress.source_name)
    }))?;

    for name in &outcome.rejected {
        println!("  BAD FILE EXTENSION: {}", name);
    }
    print_failures(&outcome.report);
    for failure in &outcome.write_failures {
        println!("  ERR {} ({})", failure.path.display(), failure.detail);
    }
    for path in &outcome.written {
        println!("  OK  {}", path.display());
    }
    println!(
        "CONVERSION COMPLETE: {} ok, {} failed, {} skipped",
        outcome.written.len(),
        outcome.report.failed + outcome.write_failures.len(),
        outcome.rejected.len()
    );

    if let Some(path) = &settings.report {
        write_report(path, &outcome.report)?;
    }
    Ok(())
}

/// Convert every category's inputs and write one archive into `out_dir`
pub fn export(categories: &[CategoryInput], out_dir: &Path, settings: &Settings) -> Result<()> {
    let config = resolve_config(settings)?;
    let mut converter = Converter::new(config)?;
    let rt = runtime()?;
    let mut reports = Vec::new();

    for input in categories {
        // Repeating a category name adds more files to it
        let name = match converter.add_category(&input.name) {
            Ok(name) => name,
            Err(CategoryRejection::Duplicate) => normalize_name(&input.name),
            Err(rejection) => {
                warn!("Skipping category '{}': {}", input.name, rejection);
                continue;
            }
        };

        let sources = collect_sources(std::slice::from_ref(&input.path))?;
        let batch = rt.block_on(converter.convert_into_category(&name, sources, |progress| {
            println!("{} converting...", progress)
        }))?;

        print_failures(&batch.report);
        println!("{}", batch.status_line());
        reports.push(batch.report);
    }

    for category in converter.categories() {
        println!("  {}", category);
    }

    let path = rt.block_on(converter.export_to_dir(out_dir, &ZipPackager::new()))?;
    println!("EXPORT COMPLETE: {}", path.display());

    if let Some(path) = &settings.report {
        write_report(path, &reports)?;
    }
    Ok(())
}

/// Print accepted input extensions
pub fn formats() -> Result<()> {
    for ext in SUPPORTED_EXTENSIONS {
        println!(".{}", ext);
    }
    Ok(())
}
