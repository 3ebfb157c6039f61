//! Conversion workflow
//!
//! [`Converter`] owns the category store, the configuration and the shared
//! decoder context for the lifetime of one session. It offers the two modes
//! of the tool:
//! - single conversion: files converted one after another and written as
//!   `<stem>_UE.wav`
//! - classification: files converted in paced groups into a category, then
//!   exported as one archive with a folder per category

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::archive::{export_archive, unique_entry_name, ArchivePackager};
use crate::audio::DecoderContext;
use crate::category::{Category, CategoryStore};
use crate::config::ConverterConfig;
use crate::error::{CategoryRejection, GameWavError, Result};
use crate::job::{ensure_supported, ConversionOutcome, OutputNaming, SourceFile};
use crate::scheduler::{BatchReport, BatchScheduler, Progress};

/// A converted file that could not be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub source_name: String,
    pub path: PathBuf,
    pub detail: String,
}

/// Outcome of single-conversion mode
#[derive(Debug, Clone)]
pub struct SingleConversionReport {
    pub report: BatchReport,
    /// Inputs skipped for their extension
    pub rejected: Vec<String>,
    /// Output files written, in submission order
    pub written: Vec<PathBuf>,
    /// Converted files whose write failed; the rest were still written
    pub write_failures: Vec<WriteFailure>,
}

/// Outcome of converting a set of files into one category
#[derive(Debug, Clone)]
pub struct CategoryBatch {
    pub category: String,
    pub report: BatchReport,
    /// Inputs skipped for their extension; not counted in the total
    pub rejected: Vec<String>,
    /// Files held by the category once the batch settled
    pub files_ready: usize,
}

impl CategoryBatch {
    pub fn status_line(&self) -> String {
        format!("{}: {} files ready", self.category, self.files_ready)
    }
}

/// Split inputs into convertible sources and rejected names
fn partition_supported(sources: Vec<SourceFile>) -> (Vec<SourceFile>, Vec<String>) {
    let mut accepted = Vec::with_capacity(sources.len());
    let mut rejected = Vec::new();
    for source in sources {
        match ensure_supported(source.name()) {
            Ok(()) => accepted.push(source),
            Err(e) => {
                warn!("{}", e);
                rejected.push(source.name().to_string());
            }
        }
    }
    (accepted, rejected)
}

/// One conversion session
#[derive(Debug)]
pub struct Converter {
    config: ConverterConfig,
    decoders: DecoderContext,
    store: CategoryStore,
}

impl Converter {
    /// Session with the symphonia decoder, created on first use
    pub fn new(config: ConverterConfig) -> Result<Self> {
        Self::with_decoders(config, DecoderContext::symphonia())
    }

    pub fn with_decoders(config: ConverterConfig, decoders: DecoderContext) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            decoders,
            store: CategoryStore::new(),
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    pub fn decoders(&self) -> &DecoderContext {
        &self.decoders
    }

    pub fn add_category(&mut self, raw_name: &str) -> std::result::Result<String, CategoryRejection> {
        self.store.add_category(raw_name)
    }

    pub fn remove_category(&mut self, name: &str) -> Option<Category> {
        self.store.remove_category(name)
    }

    pub fn categories(&self) -> &[Category] {
        self.store.list_categories()
    }

    /// Convert files one at a time, in submission order, into `out_dir`.
    ///
    /// Failed conversions are reported, not written; they do not stop the
    /// remaining files. Outputs sharing a name get a numeric suffix
    /// (`hit_UE.wav`, `hit_UE_2.wav`) so none replaces another.
    pub async fn convert_files<F>(
        &self,
        sources: Vec<SourceFile>,
        out_dir: &Path,
        mut on_progress: F,
    ) -> Result<SingleConversionReport>
    where
        F: FnMut(&Progress),
    {
        let (accepted, rejected) = partition_supported(sources);
        let scheduler = BatchScheduler::new(1, Duration::ZERO)
            .with_naming(OutputNaming::from_config(&self.config));

        let report = scheduler
            .run_sources(accepted, "CONVERT", &self.decoders, |_, progress| {
                on_progress(progress)
            })
            .await;

        tokio::fs::create_dir_all(out_dir).await?;
        let mut written = Vec::with_capacity(report.done);
        let mut write_failures = Vec::new();
        let mut taken = HashSet::new();
        for job in &report.settled {
            let Some(ConversionOutcome::Done(file)) = job.outcome() else {
                continue;
            };
            let name = unique_entry_name(&mut taken, &file.output_name);
            if name != file.output_name {
                warn!(
                    "{}: {} already used, writing {}",
                    job.source_name(),
                    file.output_name,
                    name
                );
            }
            let path = out_dir.join(&name);
            match tokio::fs::write(&path, file.container.as_bytes()).await {
                Ok(()) => {
                    info!("wrote {}", path.display());
                    written.push(path);
                }
                Err(e) => {
                    warn!("could not write {}: {}", path.display(), e);
                    write_failures.push(WriteFailure {
                        source_name: job.source_name().to_string(),
                        path,
                        detail: e.to_string(),
                    });
                }
            }
        }

        Ok(SingleConversionReport {
            report,
            rejected,
            written,
            write_failures,
        })
    }

    /// Convert files into an existing category.
    ///
    /// Unsupported extensions are filtered out first. Successful files are
    /// appended in completion order as each job settles.
    pub async fn convert_into_category<F>(
        &mut self,
        category: &str,
        sources: Vec<SourceFile>,
        mut on_progress: F,
    ) -> Result<CategoryBatch>
    where
        F: FnMut(&Progress),
    {
        let name = self
            .store
            .get(category)
            .map(|c| c.name().to_string())
            .ok_or(GameWavError::CategoryRejected(CategoryRejection::NoSuchCategory))?;

        let (accepted, rejected) = partition_supported(sources);
        let scheduler = BatchScheduler::from_config(&self.config);

        let Self {
            decoders, store, ..
        } = self;
        let report = scheduler
            .run_sources(accepted, &name, decoders, |job, progress| {
                if let Some(file) = job.outcome().and_then(ConversionOutcome::converted) {
                    if let Err(rejection) = store.append_file(&name, file.clone()) {
                        warn!("{}: could not store {}: {}", name, file.output_name, rejection);
                    }
                }
                on_progress(progress);
            })
            .await;

        let files_ready = store.get(&name).map(Category::file_count).unwrap_or(0);
        let batch = CategoryBatch {
            category: name,
            report,
            rejected,
            files_ready,
        };
        info!("{}", batch.status_line());
        Ok(batch)
    }

    /// Package every category into one archive blob
    pub fn export(&self, packager: &dyn ArchivePackager) -> Result<Vec<u8>> {
        export_archive(&self.store, packager)
    }

    /// Package and write the archive as `<dir>/<archive_name>`
    pub async fn export_to_dir(
        &self,
        dir: &Path,
        packager: &dyn ArchivePackager,
    ) -> Result<PathBuf> {
        let blob = self.export(packager)?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.config.archive_name);
        tokio::fs::write(&path, blob).await?;
        info!("archive written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let mut converter = Converter::new(ConverterConfig::default()).unwrap();
        let err = converter
            .convert_into_category("BGM", Vec::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CATEGORY_REJECTED");
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = ConverterConfig {
            concurrency_limit: 0,
            ..ConverterConfig::default()
        };
        assert!(Converter::new(config).is_err());
    }

    #[test]
    fn test_partition_supported() {
        let sources = vec![
            SourceFile::in_memory("a.mp3", vec![0u8]),
            SourceFile::in_memory("b.txt", vec![0u8]),
            SourceFile::in_memory("c.AIF", vec![0u8]),
        ];
        let (accepted, rejected) = partition_supported(sources);
        assert_eq!(accepted.len(), 2);
        assert_eq!(rejected, vec!["b.txt".to_string()]);
    }
}
