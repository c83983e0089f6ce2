//! mtag commands
//!
//! Each command takes the loaded [`AppConfig`] and returns its outcome so
//! `main` decides how to print it.

use crate::error::Result;
use crate::library::{LocalLibrary, SaveResult};
use mtag_common::{AppConfig, Field, TagItem, TagValue, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A field value before and after tagging
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: Field,
    pub before: Option<TagValue>,
    pub after: Option<TagValue>,
}

/// All changes made to one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDiff {
    pub path: PathBuf,
    pub changes: Vec<FieldChange>,
}

/// Result of the `tag` and `restore` commands
#[derive(Debug, Default)]
pub struct TagReport {
    pub diffs: Vec<TrackDiff>,
    pub saved: Vec<SaveResult>,
    pub dry_run: bool,
}

/// Tag values per file path, as written by `backup`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Backup(pub BTreeMap<PathBuf, BTreeMap<Field, TagValue>>);

/// Compare tracks before and after a tagging pass
pub fn diff_tracks(before: &[Track], after: &[Track]) -> Vec<TrackDiff> {
    let mut diffs = Vec::new();
    for (old, new) in before.iter().zip(after) {
        let changes: Vec<FieldChange> = Field::all()
            .iter()
            .filter_map(|&field| {
                let (was, now) = (old.get(field), new.get(field));
                (was != now).then_some(FieldChange {
                    field,
                    before: was,
                    after: now,
                })
            })
            .collect();
        if !changes.is_empty() {
            diffs.push(TrackDiff {
                path: old.path().to_path_buf(),
                changes,
            });
        }
    }
    diffs
}

fn log_diffs(diffs: &[TrackDiff]) {
    for diff in diffs {
        info!("{}", diff.path.display());
        for change in &diff.changes {
            info!(
                "  {:<14} {} -> {}",
                change.field.name(),
                display_value(change.before.as_ref()),
                display_value(change.after.as_ref())
            );
        }
    }
    info!(tracks = diffs.len(), "Tracks changed");
}

fn display_value(value: Option<&TagValue>) -> String {
    value.map(|v| format!("'{}'", v)).unwrap_or_else(|| "<none>".to_string())
}

fn is_dry_run(config: &AppConfig, execute: bool) -> bool {
    !execute && config.dry_run
}

fn save_library(library: &mut LocalLibrary, config: &AppConfig, dry_run: bool) -> Vec<SaveResult> {
    let results = library.save(&config.updater, dry_run);
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if dry_run {
        info!(tracks = results.len(), "Dry run: no files were written");
    } else {
        info!(
            saved = results.iter().filter(|r| r.saved).count(),
            failed, "Saved tracks"
        );
    }
    results
}

/// Apply the configured tagging rules to the library and save the results
pub fn tag(config: &AppConfig, paths: &[PathBuf], execute: bool) -> Result<TagReport> {
    let dry_run = is_dry_run(config, execute);
    if config.tags.rules.is_empty() {
        info!("No tagging rules configured, nothing to do");
        return Ok(TagReport {
            dry_run,
            ..TagReport::default()
        });
    }

    let mut library = LocalLibrary::from_config(&config.library, paths)?;
    let before = library.tracks.clone();

    config.tags.rules.set_tags(&mut library.tracks, &library.folders);

    let diffs = diff_tracks(&before, &library.tracks);
    log_diffs(&diffs);
    let saved = save_library(&mut library, config, dry_run);

    Ok(TagReport {
        diffs,
        saved,
        dry_run,
    })
}

/// Human readable summary of the configured rules
pub fn check(config: &AppConfig) -> String {
    if config.tags.rules.is_empty() {
        return "No tagging rules configured".to_string();
    }
    let mut lines = vec![format!("{} rule(s) configured", config.tags.rules.rules().len())];
    lines.extend(
        config
            .tags
            .rules
            .rules()
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{}. {}", i + 1, rule.to_string().trim_end())),
    );
    lines.join("\n")
}

/// Field names with their storage, e.g. `title (tag)`
pub fn fields() -> Vec<String> {
    Field::all()
        .iter()
        .map(|field| {
            let storage = if field.is_tag() { "tag" } else { "property" };
            format!("{} ({})", field.name(), storage)
        })
        .collect()
}

/// Write the tags of every library track to `output` as JSON
pub fn backup(config: &AppConfig, paths: &[PathBuf], output: &Path) -> Result<usize> {
    let library = LocalLibrary::from_config(&config.library, paths)?;
    let backup = Backup(
        library
            .tracks
            .iter()
            .map(|track| (track.path().to_path_buf(), track.tags().clone()))
            .collect(),
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(output)?);
    serde_json::to_writer_pretty(writer, &backup)?;

    info!(tracks = backup.0.len(), path = %output.display(), "Backup written");
    Ok(backup.0.len())
}

/// Restore tags from a backup onto matching library tracks
///
/// `tags` limits the restored fields; empty means every tag field. A field
/// missing from a track's backup entry is cleared.
pub fn restore(
    config: &AppConfig,
    paths: &[PathBuf],
    input: &Path,
    tags: &[Field],
    execute: bool,
) -> Result<TagReport> {
    let dry_run = is_dry_run(config, execute);
    let reader = BufReader::new(File::open(input)?);
    let backup: Backup = serde_json::from_reader(reader)?;

    let fields: Vec<Field> = if tags.is_empty() {
        Field::tags()
    } else {
        tags.iter().copied().filter(Field::is_tag).collect()
    };

    let mut library = LocalLibrary::from_config(&config.library, paths)?;
    let before = library.tracks.clone();

    let mut matched = 0;
    for (path, values) in &backup.0 {
        let Some(index) = library.position(path) else {
            warn!(path = %path.display(), "Backed up track not found in library");
            continue;
        };
        matched += 1;
        for &field in &fields {
            library.tracks[index].set(field, values.get(&field).cloned());
        }
    }
    info!(matched, total = backup.0.len(), "Restoring tags from backup");

    let diffs = diff_tracks(&before, &library.tracks);
    log_diffs(&diffs);
    let saved = save_library(&mut library, config, dry_run);

    Ok(TagReport {
        diffs,
        saved,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_tracks_lists_changed_fields() {
        let before = vec![
            Track::new("/music/a.flac").with(Field::Title, "Old"),
            Track::new("/music/b.flac").with(Field::Title, "Same"),
        ];
        let mut after = before.clone();
        after[0].set(Field::Title, Some("New".into()));
        after[0].set(Field::Year, Some(TagValue::Integer(2000)));

        let diffs = diff_tracks(&before, &after);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path, PathBuf::from("/music/a.flac"));
        assert_eq!(
            diffs[0].changes,
            vec![
                FieldChange {
                    field: Field::Title,
                    before: Some("Old".into()),
                    after: Some("New".into()),
                },
                FieldChange {
                    field: Field::Year,
                    before: None,
                    after: Some(TagValue::Integer(2000)),
                },
            ]
        );
    }

    #[test]
    fn test_fields_marks_storage() {
        let listing = fields();
        assert_eq!(listing.len(), Field::all().len());
        assert!(listing.contains(&"title (tag)".to_string()));
        assert!(listing.contains(&"filename (property)".to_string()));
    }

    #[test]
    fn test_check_without_rules() {
        assert_eq!(check(&AppConfig::default()), "No tagging rules configured");
    }

    #[test]
    fn test_tag_without_rules_is_noop() {
        let report = tag(&AppConfig::default(), &[], false).unwrap();
        assert!(report.diffs.is_empty());
        assert!(report.saved.is_empty());
        assert!(report.dry_run);
    }

    #[test]
    fn test_execute_overrides_dry_run() {
        let config = AppConfig::default();
        assert!(is_dry_run(&config, false));
        assert!(!is_dry_run(&config, true));

        let config = AppConfig {
            dry_run: false,
            ..AppConfig::default()
        };
        assert!(!is_dry_run(&config, false));
    }
}
