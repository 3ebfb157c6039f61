//! Export assembly
//!
//! Builds a folder -> files view of the category store and hands it to an
//! [`ArchivePackager`]. A refused or failed export leaves the store intact so
//! it can be retried.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use log::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::category::{CategoryStore, ConvertedFile};
use crate::error::{ExportRejection, GameWavError, Result};

/// One category's folder in the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFolder {
    pub name: String,
    pub files: Vec<ConvertedFile>,
}

/// Ephemeral category -> files mapping built at export time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    folders: Vec<ArchiveFolder>,
}

impl ArchiveRequest {
    /// Folders in category creation order
    pub fn folders(&self) -> &[ArchiveFolder] {
        &self.folders
    }

    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }
}

/// Snapshot the store for export.
///
/// Refuses with [`ExportRejection::NoCategories`] when there are no
/// categories and [`ExportRejection::NoFiles`] when every category is empty.
/// Empty categories still get a folder when at least one file exists.
pub fn build_archive_request(
    store: &CategoryStore,
) -> std::result::Result<ArchiveRequest, ExportRejection> {
    if store.is_empty() {
        return Err(ExportRejection::NoCategories);
    }
    if store.total_files() == 0 {
        return Err(ExportRejection::NoFiles);
    }

    let folders = store
        .list_categories()
        .iter()
        .map(|category| ArchiveFolder {
            name: category.name().to_string(),
            files: category.files().to_vec(),
        })
        .collect();

    Ok(ArchiveRequest { folders })
}

/// Serializes an [`ArchiveRequest`] into one binary blob
pub trait ArchivePackager {
    fn package(&self, request: &ArchiveRequest) -> Result<Vec<u8>>;
}

/// Zip packager: one directory per category
#[derive(Debug, Clone, Copy)]
pub struct ZipPackager {
    compression: CompressionMethod,
}

impl Default for ZipPackager {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Stored,
        }
    }
}

impl ZipPackager {
    pub fn new() -> Self {
        Self::default()
    }
}

fn packaging_error(e: impl std::fmt::Display) -> GameWavError {
    GameWavError::Packaging {
        reason: e.to_string(),
    }
}

/// Give repeated names inside one folder a numeric suffix:
/// `hit_UE.wav`, `hit_UE_2.wav`, `hit_UE_3.wav`, ...
pub(crate) fn unique_entry_name(taken: &mut HashSet<String>, name: &str) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}{}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Folder name safe to use as one zip path segment: separators and `.`/`..`
/// components become `_`, so `../X` is stored as `__X`
fn folder_entry_name(name: &str) -> String {
    name.split(['/', '\\'])
        .map(|part| match part {
            "." | ".." => "_",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("_")
}

impl ArchivePackager for ZipPackager {
    fn package(&self, request: &ArchiveRequest) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default().compression_method(self.compression);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let mut folders_taken = HashSet::new();
        for folder in request.folders() {
            let dir = unique_entry_name(&mut folders_taken, &folder_entry_name(&folder.name));
            if dir != folder.name {
                warn!("category {} stored as folder {}", folder.name, dir);
            }
            writer
                .add_directory(format!("{}/", dir), options)
                .map_err(packaging_error)?;

            let mut taken = HashSet::new();
            for file in &folder.files {
                let entry = unique_entry_name(&mut taken, &file.output_name);
                if entry != file.output_name {
                    warn!(
                        "{}: duplicate name {} stored as {}",
                        dir, file.output_name, entry
                    );
                }
                writer
                    .start_file(format!("{}/{}", dir, entry), options)
                    .map_err(packaging_error)?;
                writer
                    .write_all(file.container.as_bytes())
                    .map_err(packaging_error)?;
            }
        }

        let cursor = writer.finish().map_err(packaging_error)?;
        Ok(cursor.into_inner())
    }
}

/// Build the request from `store` and package it
pub fn export_archive(store: &CategoryStore, packager: &dyn ArchivePackager) -> Result<Vec<u8>> {
    let request = build_archive_request(store)?;
    info!(
        "packaging {} files from {} categories",
        request.file_count(),
        request.folders().len()
    );
    packager.package(&request)
}
