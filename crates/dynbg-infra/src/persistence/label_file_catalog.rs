//! Catalog source backed by a plain text file, one label per line

use std::fs;
use std::path::PathBuf;

use dynbg_domain::repository::CatalogSource;
use dynbg_types::{RawLabel, Result};

pub struct LabelFileCatalogSource {
    path: PathBuf,
}

impl LabelFileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for LabelFileCatalogSource {
    /// Blank lines and `#` comments are skipped; the file is re-read every call
    fn list_raw_labels(&self) -> Result<Vec<RawLabel>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(RawLabel::from_label)
            .collect())
    }
}
