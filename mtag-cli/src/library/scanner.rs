//! Audio file discovery under library folders

use crate::error::ScanError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Walks library folders collecting files with accepted extensions
pub struct LibraryScanner {
    extensions: Vec<String>,
    ignore_patterns: Vec<String>,
}

impl LibraryScanner {
    /// Create a scanner accepting `extensions` (with or without the leading dot)
    ///
    /// System files like .DS_Store, Thumbs.db and VCS folders are ignored,
    /// as is any entry whose name starts with a dot.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            ignore_patterns: vec![
                "Thumbs.db".to_string(),
                "desktop.ini".to_string(),
                "node_modules".to_string(),
            ],
        }
    }

    /// Accepted audio files under `root`, sorted by path within each folder
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.should_process_entry(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_accepted(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(root = %root.display(), count = files.len(), "Scanned library folder");
        Ok(files)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with('.') {
            return false;
        }
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.eq_ignore_ascii_case(pattern))
    }

    fn is_accepted(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}
