//! Track items and collections
//!
//! The rule engine only needs field-keyed access to items, expressed by
//! [`TagItem`]. [`Track`] is the concrete item loaded from a local
//! library; [`Collection`] groups items by index (e.g. one per album folder).

use crate::field::Field;
use crate::value::TagValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// An item whose fields can be read and written by the rule engine
pub trait TagItem {
    /// Get the current value of `field`, `None` when absent
    fn get(&self, field: Field) -> Option<TagValue>;

    /// Assign `value` to `field`, `None` clears it
    fn set(&mut self, field: Field, value: Option<TagValue>);

    /// Location of the item's file
    fn path(&self) -> &Path;
}

/// A music file and its tag values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    path: PathBuf,
    tags: BTreeMap<Field, TagValue>,
    #[serde(skip)]
    changed: BTreeSet<Field>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: BTreeMap::new(),
            changed: BTreeSet::new(),
        }
    }

    /// Builder-style tag assignment that does not mark the field as changed
    pub fn with(mut self, field: Field, value: impl Into<TagValue>) -> Self {
        if let Some(value) = value.into().coerce(field.kind()) {
            self.tags.insert(field, value);
        }
        self
    }

    /// Tag fields modified since load or the last [`Track::mark_clean`]
    pub fn changed_fields(&self) -> &BTreeSet<Field> {
        &self.changed
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn mark_clean(&mut self) {
        self.changed.clear();
    }

    /// All stored tag values
    pub fn tags(&self) -> &BTreeMap<Field, TagValue> {
        &self.tags
    }

    fn file_stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
    }

    fn set_property(&mut self, field: Field, value: TagValue) {
        let text = value.to_string();
        match field {
            Field::Path => self.path = PathBuf::from(text),
            Field::Filename => {
                let name = match self.path.extension() {
                    Some(ext) => format!("{}.{}", text, ext.to_string_lossy()),
                    None => text,
                };
                self.path.set_file_name(name);
            }
            Field::Ext => {
                self.path.set_extension(text.trim_start_matches('.'));
            }
            Field::Folder => {
                let Some(file_name) = self.path.file_name().map(|n| n.to_os_string()) else {
                    return;
                };
                let grandparent = self
                    .path
                    .parent()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                self.path = grandparent.join(text).join(file_name);
            }
            _ => tracing::debug!(%field, "Not a file property"),
        }
    }
}

impl TagItem for Track {
    fn get(&self, field: Field) -> Option<TagValue> {
        match field {
            Field::Path => Some(TagValue::Text(self.path.to_string_lossy().to_string())),
            Field::Folder => self
                .path
                .parent()
                .and_then(Path::file_name)
                .map(|name| TagValue::Text(name.to_string_lossy().to_string())),
            Field::Filename => self.file_stem().map(TagValue::Text),
            Field::Ext => self
                .path
                .extension()
                .map(|ext| TagValue::Text(format!(".{}", ext.to_string_lossy()))),
            _ => self.tags.get(&field).cloned(),
        }
    }

    fn set(&mut self, field: Field, value: Option<TagValue>) {
        if !field.is_tag() {
            match value {
                Some(value) => self.set_property(field, value),
                None => tracing::debug!(%field, "Ignoring attempt to clear a file property"),
            }
            return;
        }

        let new_value = match value {
            None => None,
            Some(value) => match value.clone().coerce(field.kind()) {
                Some(coerced) => Some(coerced),
                None => {
                    warn!(
                        path = %self.path.display(),
                        %field,
                        value = %value,
                        "Value cannot be stored in field, leaving unchanged"
                    );
                    return;
                }
            },
        };

        if self.tags.get(&field) == new_value.as_ref() {
            return;
        }

        match new_value {
            Some(value) => self.tags.insert(field, value),
            None => self.tags.remove(&field),
        };
        self.changed.insert(field);
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// A named group of items, stored as indices into the caller's item slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    members: Vec<usize>,
}

impl Collection {
    pub fn new(name: impl Into<String>, members: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn push(&mut self, index: usize) {
        self.members.push(index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
