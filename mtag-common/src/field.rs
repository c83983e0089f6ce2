//! Track field identifiers
//!
//! Names every tag slot and file property that rules can read, write,
//! group or sort by. Field names in config files are matched
//! case-insensitively with spaces and hyphens treated as underscores.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    List,
}

/// A named tag slot or file property on a track
///
/// Tag fields are stored in the audio file's tag. Property fields
/// (path, folder, filename, ext) are derived from the file's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Artist,
    Album,
    AlbumArtist,
    TrackNumber,
    TrackTotal,
    DiscNumber,
    DiscTotal,
    Year,
    Genres,
    Bpm,
    Key,
    Comments,
    Compilation,
    Path,
    Folder,
    Filename,
    Ext,
}

/// Alternative names accepted in config files
const ALIASES: &[(&str, Field)] = &[
    ("name", Field::Title),
    ("track", Field::TrackNumber),
    ("disc", Field::DiscNumber),
    ("genre", Field::Genres),
    ("comment", Field::Comments),
    ("extension", Field::Ext),
];

static NAME_LOOKUP: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    Field::all()
        .iter()
        .map(|field| (field.name(), *field))
        .chain(ALIASES.iter().copied())
        .collect()
});

impl Field {
    /// Parse a field from its config name or alias
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let normalised = name.trim().to_lowercase().replace([' ', '-'], "_");
        NAME_LOOKUP.get(normalised.as_str()).copied().ok_or_else(|| {
            let valid: Vec<&str> = Field::all().iter().map(|f| f.name()).collect();
            ConfigError::new(format!(
                "Unrecognised field. Valid fields: {}",
                valid.join(", ")
            ))
            .with_key("field")
            .with_value(name)
        })
    }

    /// Parse many field names, failing on the first unrecognised one
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, ConfigError> {
        names.iter().map(|name| Self::from_name(name.as_ref())).collect()
    }

    /// Canonical config name
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Artist => "artist",
            Field::Album => "album",
            Field::AlbumArtist => "album_artist",
            Field::TrackNumber => "track_number",
            Field::TrackTotal => "track_total",
            Field::DiscNumber => "disc_number",
            Field::DiscTotal => "disc_total",
            Field::Year => "year",
            Field::Genres => "genres",
            Field::Bpm => "bpm",
            Field::Key => "key",
            Field::Comments => "comments",
            Field::Compilation => "compilation",
            Field::Path => "path",
            Field::Folder => "folder",
            Field::Filename => "filename",
            Field::Ext => "ext",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::TrackNumber
            | Field::TrackTotal
            | Field::DiscNumber
            | Field::DiscTotal
            | Field::Year => FieldKind::Integer,
            Field::Bpm => FieldKind::Float,
            Field::Compilation => FieldKind::Bool,
            Field::Genres | Field::Comments => FieldKind::List,
            _ => FieldKind::Text,
        }
    }

    /// Whether this field is stored in the file's tag rather than derived from its path
    pub fn is_tag(&self) -> bool {
        !matches!(self, Field::Path | Field::Folder | Field::Filename | Field::Ext)
    }

    /// Whether values of this field are stable enough to group or sort by
    pub fn is_sortable(&self) -> bool {
        !matches!(self, Field::Genres | Field::Comments)
    }

    /// Get all fields in declaration order
    pub fn all() -> &'static [Field] {
        &[
            Field::Title,
            Field::Artist,
            Field::Album,
            Field::AlbumArtist,
            Field::TrackNumber,
            Field::TrackTotal,
            Field::DiscNumber,
            Field::DiscTotal,
            Field::Year,
            Field::Genres,
            Field::Bpm,
            Field::Key,
            Field::Comments,
            Field::Compilation,
            Field::Path,
            Field::Folder,
            Field::Filename,
            Field::Ext,
        ]
    }

    /// Get all tag fields, i.e. the fields which may be written back to a file
    pub fn tags() -> Vec<Field> {
        Self::all().iter().copied().filter(Field::is_tag).collect()
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_canonical_names() {
        for field in Field::all() {
            assert_eq!(Field::from_name(field.name()).unwrap(), *field);
        }
    }

    #[test]
    fn test_from_name_normalises_case_and_separators() {
        assert_eq!(Field::from_name("Track Number").unwrap(), Field::TrackNumber);
        assert_eq!(Field::from_name("album-artist").unwrap(), Field::AlbumArtist);
        assert_eq!(Field::from_name("  YEAR ").unwrap(), Field::Year);
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(Field::from_name("name").unwrap(), Field::Title);
        assert_eq!(Field::from_name("track").unwrap(), Field::TrackNumber);
        assert_eq!(Field::from_name("disc").unwrap(), Field::DiscNumber);
        assert_eq!(Field::from_name("extension").unwrap(), Field::Ext);
    }

    #[test]
    fn test_from_name_unknown_reports_value() {
        let err = Field::from_name("colour").unwrap_err();
        assert_eq!(err.key.as_deref(), Some("field"));
        assert_eq!(err.value.as_deref(), Some("colour"));
        assert!(err.message.contains("track_number"));
    }

    #[test]
    fn test_tag_and_property_split() {
        let tags = Field::tags();
        assert!(tags.contains(&Field::Title));
        assert!(tags.contains(&Field::Compilation));
        assert!(!tags.contains(&Field::Path));
        assert!(!tags.contains(&Field::Filename));
        assert_eq!(tags.len() + 4, Field::all().len());
    }

    #[test]
    fn test_sortable_excludes_multi_value_fields() {
        assert!(Field::TrackNumber.is_sortable());
        assert!(Field::Filename.is_sortable());
        assert!(!Field::Genres.is_sortable());
        assert!(!Field::Comments.is_sortable());
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Field::AlbumArtist).unwrap();
        assert_eq!(json, "\"album_artist\"");
    }
}
