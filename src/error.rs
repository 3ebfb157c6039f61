//! Error handling for GameWav
//!
//! Every failure path produces a reason string distinguishable by kind.
//! Nothing here is fatal to the process: a failed job or a failed export
//! leaves the converter usable.

use std::fmt;

use thiserror::Error;

/// Result type alias for GameWav operations
pub type Result<T> = std::result::Result<T, GameWavError>;

/// Why a category operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRejection {
    /// Name was empty after trimming
    Empty,
    /// A category with the normalized name already exists
    Duplicate,
    /// Append targeted a category that does not exist
    NoSuchCategory,
}

impl CategoryRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            CategoryRejection::Empty => "empty",
            CategoryRejection::Duplicate => "duplicate",
            CategoryRejection::NoSuchCategory => "no such category",
        }
    }
}

impl fmt::Display for CategoryRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Why an export attempt was refused before packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRejection {
    NoCategories,
    NoFiles,
}

impl ExportRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            ExportRejection::NoCategories => "no categories",
            ExportRejection::NoFiles => "no files",
        }
    }
}

impl fmt::Display for ExportRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Main error type for GameWav operations
#[derive(Error, Debug)]
pub enum GameWavError {
    // Input Errors
    #[error("Unsupported file extension: {name}")]
    UnsupportedExtension { name: String },

    #[error("Decode failed for {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("Invalid audio buffer: {reason}")]
    InvalidBuffer { reason: String },

    // Category / Export Errors
    #[error("Category rejected: {0}")]
    CategoryRejected(CategoryRejection),

    #[error("Export rejected: {0}")]
    ExportRejected(ExportRejection),

    #[error("Packaging failed: {reason}")]
    Packaging { reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CategoryRejection> for GameWavError {
    fn from(rejection: CategoryRejection) -> Self {
        GameWavError::CategoryRejected(rejection)
    }
}

impl From<ExportRejection> for GameWavError {
    fn from(rejection: ExportRejection) -> Self {
        GameWavError::ExportRejected(rejection)
    }
}

impl GameWavError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            GameWavError::UnsupportedExtension { .. } => "UNSUPPORTED_EXTENSION",
            GameWavError::Decode { .. } => "DECODE_ERROR",
            GameWavError::InvalidBuffer { .. } => "INVALID_BUFFER",
            GameWavError::CategoryRejected(_) => "CATEGORY_REJECTED",
            GameWavError::ExportRejected(_) => "EXPORT_REJECTED",
            GameWavError::Packaging { .. } => "PACKAGING_ERROR",
            GameWavError::Config { .. } => "CONFIG_ERROR",
            GameWavError::Io(_) => "IO_ERROR",
            GameWavError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can retry or continue after this error.
    ///
    /// Rejections and packaging failures leave the category store intact,
    /// so the export can be attempted again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            GameWavError::UnsupportedExtension { .. } => true,
            GameWavError::Decode { .. } => true,
            GameWavError::InvalidBuffer { .. } => true,
            GameWavError::CategoryRejected(_) => true,
            GameWavError::ExportRejected(_) => true,
            GameWavError::Packaging { .. } => true,
            GameWavError::Config { .. } => false,
            GameWavError::Io(_) => false,
            GameWavError::Serialization(_) => false,
        }
    }

    /// Short status line shown to the user
    pub fn status_message(&self) -> String {
        match self {
            GameWavError::UnsupportedExtension { .. } => "BAD FILE EXTENSION".to_string(),
            GameWavError::Decode { name, .. } => format!("CONVERSION FAILED: {}", name),
            GameWavError::CategoryRejected(CategoryRejection::Duplicate) => {
                "CATEGORY ALREADY EXISTS".to_string()
            }
            GameWavError::ExportRejected(ExportRejection::NoCategories) => {
                "ADD A CATEGORY FIRST".to_string()
            }
            GameWavError::ExportRejected(ExportRejection::NoFiles) => {
                "NO CONVERTED FILES".to_string()
            }
            GameWavError::Packaging { .. } => "PACKAGING FAILED".to_string(),
            _ => self.to_string(),
        }
    }
}
