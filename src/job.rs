//! Conversion jobs
//!
//! A [`ConversionJob`] wraps one source file on its way through
//! read -> decode -> encode. Only the scheduler advances a job, and every job
//! reaches exactly one terminal state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::{encode, AudioBuffer};
use crate::category::ConvertedFile;
use crate::config::ConverterConfig;
use crate::error::{GameWavError, Result};

/// Input extensions accepted before decoding is attempted (case-insensitive)
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "aiff", "aif"];

/// Check a file name against [`SUPPORTED_EXTENSIONS`]
pub fn is_supported(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Reject unsupported names with [`GameWavError::UnsupportedExtension`]
pub fn ensure_supported(name: &str) -> Result<()> {
    if is_supported(name) {
        Ok(())
    } else {
        Err(GameWavError::UnsupportedExtension {
            name: name.to_string(),
        })
    }
}

/// How converted files are named: `<stem><suffix>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub suffix: String,
    pub extension: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self::from_config(&ConverterConfig::default())
    }
}

impl OutputNaming {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            suffix: config.output_suffix.clone(),
            extension: config.output_extension.clone(),
        }
    }

    /// Replace the last extension of `source_name`.
    ///
    /// `"intro.mp3"` becomes `"intro_UE.wav"`; a name without an extension
    /// keeps its full text as the stem.
    pub fn output_name(&self, source_name: &str) -> String {
        let stem = match source_name.rfind('.') {
            Some(dot) if dot + 1 < source_name.len() && !source_name[dot..].contains('/') => {
                &source_name[..dot]
            }
            _ => source_name,
        };
        format!("{}{}.{}", stem, self.suffix, self.extension)
    }
}

/// Where a job's bytes come from
#[derive(Debug, Clone)]
pub enum JobSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A submitted input file
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    source: JobSource,
}

impl SourceFile {
    /// Source read from disk; the name is the path's file name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: JobSource::Path(path),
        }
    }

    /// Source already held in memory
    pub fn in_memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: JobSource::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub fn is_supported(&self) -> bool {
        is_supported(&self.name)
    }

    /// Load the raw file bytes
    pub async fn read(&self) -> Result<Arc<[u8]>> {
        match &self.source {
            JobSource::Path(path) => Ok(Arc::from(tokio::fs::read(path).await?)),
            JobSource::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

/// Lifecycle of a conversion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Decoding,
    Encoding,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Stage at which a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source bytes could not be loaded
    Read,
    /// Bytes are not valid audio or use an unsupported codec
    Decode,
    /// Decoded audio could not be encoded
    Encode,
    /// The job's task ended without reporting a result
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Read => "read",
            FailureKind::Decode => "decode",
            FailureKind::Encode => "encode",
            FailureKind::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Terminal result of a job
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Done(ConvertedFile),
    Failed { kind: FailureKind, detail: String },
}

impl ConversionOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, ConversionOutcome::Done(_))
    }

    pub fn converted(&self) -> Option<&ConvertedFile> {
        match self {
            ConversionOutcome::Done(file) => Some(file),
            ConversionOutcome::Failed { .. } => None,
        }
    }
}

/// One source file on its way through decode and encode
#[derive(Debug, Clone)]
pub struct ConversionJob {
    id: Uuid,
    source: SourceFile,
    status: JobStatus,
    outcome: Option<ConversionOutcome>,
}

impl ConversionJob {
    pub fn new(source: SourceFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            status: JobStatus::Pending,
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Terminal outcome, `None` until the job settles
    pub fn outcome(&self) -> Option<&ConversionOutcome> {
        self.outcome.as_ref()
    }

    /// Move to an intermediate state. Ignored once the job has settled.
    pub(crate) fn advance(&mut self, status: JobStatus) {
        debug_assert!(!status.is_terminal());
        if self.status.is_terminal() {
            warn!("job {} already settled, ignoring {:?}", self.id, status);
            return;
        }
        self.status = status;
    }

    /// Record the terminal outcome. Returns false if the job had already
    /// settled, in which case nothing changes.
    pub(crate) fn settle(&mut self, outcome: ConversionOutcome) -> bool {
        if self.status.is_terminal() {
            warn!("job {} settled twice, keeping first outcome", self.id);
            return false;
        }
        self.status = if outcome.is_done() {
            JobStatus::Done
        } else {
            JobStatus::Failed
        };
        self.outcome = Some(outcome);
        true
    }
}

/// Encode a decoded buffer into a named converted file
pub fn encode_file(source_name: &str, buffer: &AudioBuffer, naming: &OutputNaming) -> ConvertedFile {
    ConvertedFile {
        output_name: naming.output_name(source_name),
        container: encode(buffer),
    }
}
