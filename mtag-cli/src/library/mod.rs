//! Local music library
//!
//! Scans library folders, loads every accepted file as a [`Track`] and
//! groups tracks into one [`Collection`] per parent folder. Changed tags
//! are written back through [`tags::write_track`].

pub mod scanner;
pub mod tags;

pub use scanner::LibraryScanner;

use crate::error::{Result, ScanError};
use mtag_common::config::{LibraryConfig, UpdaterConfig};
use mtag_common::{Collection, Field, TagItem, Track};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of saving one track
#[derive(Debug, Clone, PartialEq)]
pub struct SaveResult {
    pub path: PathBuf,
    /// Fields written, or that would be written on a dry run
    pub fields: Vec<Field>,
    pub saved: bool,
    pub error: Option<String>,
}

/// Tracks loaded from local folders
#[derive(Debug, Default)]
pub struct LocalLibrary {
    pub tracks: Vec<Track>,
    /// One collection per parent folder, in scan order
    pub folders: Vec<Collection>,
    /// On-disk location of each track as loaded
    sources: Vec<PathBuf>,
}

impl LocalLibrary {
    /// Build a library from already loaded tracks
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut folders: Vec<Collection> = Vec::new();
        let mut folder_index: HashMap<PathBuf, usize> = HashMap::new();

        for (index, track) in tracks.iter().enumerate() {
            let parent = track.path().parent().map(Path::to_path_buf).unwrap_or_default();
            let position = *folder_index.entry(parent.clone()).or_insert_with(|| {
                let name = parent
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| parent.to_string_lossy().to_string());
                folders.push(Collection::new(name, Vec::new()));
                folders.len() - 1
            });
            folders[position].push(index);
        }

        let sources = tracks.iter().map(|track| track.path().to_path_buf()).collect();
        Self {
            tracks,
            folders,
            sources,
        }
    }

    /// Scan `paths` and read every accepted file
    ///
    /// Files whose tags cannot be read are logged and skipped.
    pub fn load(paths: &[PathBuf], extensions: &[String]) -> Result<Self> {
        if paths.is_empty() {
            return Err(ScanError::NoPaths.into());
        }

        let scanner = LibraryScanner::new(extensions);
        let mut tracks = Vec::new();
        for root in paths {
            for file in scanner.scan(root)? {
                match tags::read_track(&file) {
                    Ok(track) => tracks.push(track),
                    Err(e) => warn!("Skipping unreadable file: {}", e),
                }
            }
        }

        let library = Self::from_tracks(tracks);
        info!(
            tracks = library.tracks.len(),
            folders = library.folders.len(),
            "Loaded local library"
        );
        Ok(library)
    }

    /// Load the library described by `config`, with `paths` taking precedence when given
    pub fn from_config(config: &LibraryConfig, paths: &[PathBuf]) -> Result<Self> {
        let paths = if paths.is_empty() { &config.paths } else { paths };
        Self::load(paths, &config.extensions)
    }

    /// Original location of the track at `index`
    pub fn source(&self, index: usize) -> Option<&Path> {
        self.sources.get(index).map(PathBuf::as_path)
    }

    /// Index of the track loaded from `path`
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.sources.iter().position(|source| source == path)
    }

    /// Write changed tags permitted by `updater` back to each file
    ///
    /// On a dry run nothing is written and every result has `saved` false.
    /// A failure on one file is recorded in its result and saving continues.
    pub fn save(&mut self, updater: &UpdaterConfig, dry_run: bool) -> Vec<SaveResult> {
        let mut results = Vec::new();

        for (track, source) in self.tracks.iter_mut().zip(&self.sources) {
            let fields: Vec<Field> = track
                .changed_fields()
                .iter()
                .copied()
                .filter(|field| updater.tags.contains(field))
                .collect();
            if fields.is_empty() {
                continue;
            }
            if track.path() != source.as_path() {
                warn!(
                    from = %source.display(),
                    to = %track.path().display(),
                    "Path changes are not applied to files"
                );
            }

            if dry_run {
                debug!(path = %source.display(), ?fields, "Dry run, not saving");
                results.push(SaveResult {
                    path: source.clone(),
                    fields,
                    saved: false,
                    error: None,
                });
                continue;
            }

            match tags::write_track(source, track, &fields, updater.replace) {
                Ok(written) => {
                    track.mark_clean();
                    results.push(SaveResult {
                        path: source.clone(),
                        saved: !written.is_empty(),
                        fields: written,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Failed to save: {}", e);
                    results.push(SaveResult {
                        path: source.clone(),
                        fields,
                        saved: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtag_common::TagValue;

    fn library() -> LocalLibrary {
        LocalLibrary::from_tracks(vec![
            Track::new("/music/A/01.flac"),
            Track::new("/music/B/01.flac"),
            Track::new("/music/A/02.flac"),
        ])
    }

    #[test]
    fn test_tracks_grouped_by_parent_folder() {
        let library = library();
        assert_eq!(library.folders.len(), 2);
        assert_eq!(library.folders[0].name, "A");
        assert_eq!(library.folders[0].members(), &[0, 2]);
        assert_eq!(library.folders[1].name, "B");
        assert_eq!(library.folders[1].members(), &[1]);
    }

    #[test]
    fn test_position_uses_loaded_path() {
        let mut library = library();
        library.tracks[1].set(Field::Filename, Some("renamed".into()));
        assert_eq!(library.position(Path::new("/music/B/01.flac")), Some(1));
        assert_eq!(library.source(1), Some(Path::new("/music/B/01.flac")));
    }

    #[test]
    fn test_dry_run_reports_permitted_changes_only() {
        let mut library = library();
        library.tracks[0].set(Field::Title, Some("T".into()));
        library.tracks[0].set(Field::Year, Some(TagValue::Integer(2001)));

        let updater = UpdaterConfig {
            tags: vec![Field::Title],
            replace: false,
        };
        let results = library.save(&updater, true);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, PathBuf::from("/music/A/01.flac"));
        assert_eq!(results[0].fields, vec![Field::Title]);
        assert!(!results[0].saved);
        assert!(library.tracks[0].is_changed(), "dry run keeps changes pending");
    }

    #[test]
    fn test_load_without_paths_fails() {
        let result = LocalLibrary::load(&[], &["flac".to_string()]);
        assert!(matches!(result, Err(crate::Error::Scan(ScanError::NoPaths))));
    }
}
