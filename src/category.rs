//! Category store
//!
//! User-defined buckets that collect converted files for a combined export.
//! Names are normalized (trimmed, upper-cased) and unique at creation time.
//! Files are appended in the order their jobs complete.

use std::fmt;

use log::{debug, info};

use crate::audio::EncodedContainer;
use crate::error::CategoryRejection;

/// A successfully converted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub output_name: String,
    pub container: EncodedContainer,
}

/// Named bucket of converted files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    files: Vec<ConvertedFile>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[ConvertedFile] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.files.len())
    }
}

/// Normalize a raw category name: trim surrounding whitespace, upper-case
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Owned collection of categories, in creation order
#[derive(Debug, Clone, Default)]
pub struct CategoryStore {
    categories: Vec<Category>,
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a category. Returns the normalized name.
    ///
    /// A rejection leaves the store unchanged.
    pub fn add_category(&mut self, raw_name: &str) -> Result<String, CategoryRejection> {
        let name = normalize_name(raw_name);
        if name.is_empty() {
            debug!("rejected empty category name {:?}", raw_name);
            return Err(CategoryRejection::Empty);
        }
        if self.contains(&name) {
            debug!("rejected duplicate category {}", name);
            return Err(CategoryRejection::Duplicate);
        }

        info!("added category {}", name);
        self.categories.push(Category {
            name: name.clone(),
            files: Vec::new(),
        });
        Ok(name)
    }

    /// Delete a category and all of its files. No-op if it does not exist.
    pub fn remove_category(&mut self, name: &str) -> Option<Category> {
        let name = normalize_name(name);
        let index = self.categories.iter().position(|c| c.name == name)?;
        let removed = self.categories.remove(index);
        info!(
            "removed category {} with {} files",
            removed.name,
            removed.files.len()
        );
        Some(removed)
    }

    /// Append a converted file to an existing category
    pub fn append_file(
        &mut self,
        category_name: &str,
        file: ConvertedFile,
    ) -> Result<(), CategoryRejection> {
        let name = normalize_name(category_name);
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or(CategoryRejection::NoSuchCategory)?;
        debug!("{} <- {}", category.name, file.output_name);
        category.files.push(file);
        Ok(())
    }

    /// Read view of all categories in creation order
    pub fn list_categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        let name = normalize_name(name);
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Sum of file counts over all categories
    pub fn total_files(&self) -> usize {
        self.categories.iter().map(Category::file_count).sum()
    }
}
