//! Tag reading and writing through lofty
//!
//! Values are read from the file's primary tag, falling back to the first
//! tag present. Writes always go to the primary tag, which is created when
//! the file has none.

use crate::error::{Error, Result};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, ItemValue, Tag, TagItem as LoftyTagItem};
use mtag_common::{Field, TagItem, TagValue, Track};
use std::path::Path;

/// Read a track and its tag values from `path`
pub fn read_track(path: &Path) -> Result<Track> {
    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|e| Error::tag(path, e))?;

    let mut track = Track::new(path);
    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        tracing::debug!(path = %path.display(), "No tags found");
        return Ok(track);
    };

    for field in Field::tags() {
        if let Some(value) = read_field(tag, field) {
            track = track.with(field, value);
        }
    }
    Ok(track)
}

fn read_field(tag: &Tag, field: Field) -> Option<TagValue> {
    match field {
        Field::Title => tag.title().map(|s| TagValue::Text(s.to_string())),
        Field::Artist => tag.artist().map(|s| TagValue::Text(s.to_string())),
        Field::Album => tag.album().map(|s| TagValue::Text(s.to_string())),
        Field::AlbumArtist => text_item(tag, &ItemKey::AlbumArtist),
        Field::TrackNumber => tag.track().map(integer),
        Field::TrackTotal => tag.track_total().map(integer),
        Field::DiscNumber => tag.disk().map(integer),
        Field::DiscTotal => tag.disk_total().map(integer),
        Field::Year => tag.year().map(integer),
        Field::Genres => list_item(tag, &ItemKey::Genre),
        Field::Comments => list_item(tag, &ItemKey::Comment),
        Field::Key => text_item(tag, &ItemKey::InitialKey),
        Field::Bpm => tag
            .get_string(&ItemKey::Bpm)
            .or_else(|| tag.get_string(&ItemKey::IntegerBpm))
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(TagValue::Float),
        Field::Compilation => tag
            .get_string(&ItemKey::FlagCompilation)
            .map(|s| TagValue::Bool(matches!(s.trim(), "1" | "true" | "True"))),
        Field::Path | Field::Folder | Field::Filename | Field::Ext => None,
    }
}

fn integer(n: u32) -> TagValue {
    TagValue::Integer(i64::from(n))
}

fn text_item(tag: &Tag, key: &ItemKey) -> Option<TagValue> {
    tag.get_string(key).map(|s| TagValue::Text(s.to_string()))
}

fn list_item(tag: &Tag, key: &ItemKey) -> Option<TagValue> {
    let values: Vec<String> = tag.get_strings(key).map(String::from).collect();
    (!values.is_empty()).then_some(TagValue::List(values))
}

/// Write `fields` of `track` to the file at `path`
///
/// With `replace` false an absent value leaves the file's existing tag in
/// place; with `replace` true it removes it. Returns the fields written.
pub fn write_track(path: &Path, track: &Track, fields: &[Field], replace: bool) -> Result<Vec<Field>> {
    let mut tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|e| Error::tag(path, e))?;

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let mut written = Vec::new();
    if let Some(tag) = tagged_file.primary_tag_mut() {
        for &field in fields {
            let value = track.get(field);
            if value.is_none() && !replace {
                continue;
            }
            if write_field(tag, field, value.as_ref()) {
                written.push(field);
            } else {
                tracing::warn!(path = %path.display(), %field, "Value cannot be written to this tag format");
            }
        }
    }

    if written.is_empty() {
        return Ok(written);
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|e| Error::tag(path, e))?;
    tracing::debug!(path = %path.display(), count = written.len(), "Saved tags");
    Ok(written)
}

/// Apply one field to `tag`; false when the tag format cannot store it
fn write_field(tag: &mut Tag, field: Field, value: Option<&TagValue>) -> bool {
    match field {
        Field::Title => match value {
            Some(v) => tag.set_title(v.to_string()),
            None => tag.remove_title(),
        },
        Field::Artist => match value {
            Some(v) => tag.set_artist(v.to_string()),
            None => tag.remove_artist(),
        },
        Field::Album => match value {
            Some(v) => tag.set_album(v.to_string()),
            None => tag.remove_album(),
        },
        Field::TrackNumber => return write_number(tag, value, |t, n| t.set_track(n), |t| t.remove_track()),
        Field::TrackTotal => {
            return write_number(tag, value, |t, n| t.set_track_total(n), |t| t.remove_track_total())
        }
        Field::DiscNumber => return write_number(tag, value, |t, n| t.set_disk(n), |t| t.remove_disk()),
        Field::DiscTotal => {
            return write_number(tag, value, |t, n| t.set_disk_total(n), |t| t.remove_disk_total())
        }
        Field::Year => return write_number(tag, value, |t, n| t.set_year(n), |t| t.remove_year()),
        Field::AlbumArtist => return write_text(tag, ItemKey::AlbumArtist, value),
        Field::Key => return write_text(tag, ItemKey::InitialKey, value),
        Field::Genres => return write_list(tag, ItemKey::Genre, value),
        Field::Comments => return write_list(tag, ItemKey::Comment, value),
        Field::Bpm => {
            tag.remove_key(&ItemKey::Bpm);
            tag.remove_key(&ItemKey::IntegerBpm);
            let Some(value) = value else {
                return true;
            };
            let text = value.to_string();
            return tag.insert_text(ItemKey::Bpm, text.clone())
                || tag.insert_text(ItemKey::IntegerBpm, text);
        }
        Field::Compilation => {
            let value = value.map(|v| match v {
                TagValue::Bool(true) => TagValue::Text("1".to_string()),
                _ => TagValue::Text("0".to_string()),
            });
            return write_text(tag, ItemKey::FlagCompilation, value.as_ref());
        }
        Field::Path | Field::Folder | Field::Filename | Field::Ext => return false,
    }
    true
}

/// Numeric tag slots hold a `u32`; other present values are not written
fn write_number(
    tag: &mut Tag,
    value: Option<&TagValue>,
    set: fn(&mut Tag, u32),
    remove: fn(&mut Tag),
) -> bool {
    match value {
        None => {
            remove(tag);
            true
        }
        Some(value) => match value.as_integer().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => {
                set(tag, n);
                true
            }
            None => false,
        },
    }
}

fn write_text(tag: &mut Tag, key: ItemKey, value: Option<&TagValue>) -> bool {
    match value {
        Some(v) => tag.insert_text(key, v.to_string()),
        None => {
            tag.remove_key(&key);
            true
        }
    }
}

fn write_list(tag: &mut Tag, key: ItemKey, value: Option<&TagValue>) -> bool {
    tag.remove_key(&key);
    let values = match value {
        Some(TagValue::List(values)) => values.clone(),
        Some(other) => vec![other.to_string()],
        None => return true,
    };

    let mut stored = true;
    for text in values {
        stored &= tag.push(LoftyTagItem::new(key.clone(), ItemValue::Text(text)));
    }
    stored
}
