//! Catalog source backed by a directory of background images

use std::fs;
use std::path::{Path, PathBuf};

use dynbg_domain::repository::CatalogSource;
use dynbg_types::{RawLabel, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// Lists image files in one directory (non-recursive).
///
/// The file name is the handle and the file stem is the raw label, so
/// `wine cellar [indoor].jpg` yields label `wine cellar [indoor]`.
pub struct DirectoryCatalogSource {
    dir: PathBuf,
}

impl DirectoryCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl CatalogSource for DirectoryCatalogSource {
    fn list_raw_labels(&self) -> Result<Vec<RawLabel>> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_image(&path) {
                continue;
            }
            let (Some(name), Some(stem)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|s| s.to_str()),
            ) else {
                tracing::debug!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };
            labels.push(RawLabel::new(name, stem));
        }

        // read_dir order is platform dependent
        labels.sort_by(|a, b| a.handle.cmp(&b.handle));
        tracing::debug!(dir = %self.dir.display(), count = labels.len(), "listed background directory");
        Ok(labels)
    }
}
