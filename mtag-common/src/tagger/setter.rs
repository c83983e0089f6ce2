//! Value setters
//!
//! A [`Setter`] assigns one field on an item, gated by a condition. The
//! value comes from its [`Operation`]: a literal, another field, a join
//! of getters, a template, or a group-relative computation over the
//! item's peers (incremental numbering, min, max).
//!
//! Setters operate on an item slice by index so group-relative operations
//! can read peers while the target item is updated afterwards.

use super::getter::{getter_from_config, Getter};
use super::template::Template;
use crate::error::ConfigError;
use crate::field::Field;
use crate::filter::ConditionFilter;
use crate::track::TagItem;
use crate::value::TagValue;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use tracing::trace;

type SetterConstructor = fn(Field, &Map<String, Value>) -> Result<Operation, ConfigError>;

/// Operations selected through the `operation` key
const SETTERS: &[(&str, SetterConstructor)] = &[
    ("clear", Operation::clear_from_config),
    ("min", Operation::min_from_config),
    ("max", Operation::max_from_config),
    ("join", Operation::join_from_config),
    ("incremental", Operation::incremental_from_config),
    ("template", Operation::template_from_config),
];

/// Keys which configure a setter itself rather than template getters
const TEMPLATE_RESERVED_KEYS: &[&str] = &["operation", "template", "when"];

/// Numbering of an item by its position within its sorted peer group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incremental {
    pub group_by: Vec<Field>,
    pub sort_by: Vec<Field>,
    pub start: i64,
    pub increment: i64,
}

impl Incremental {
    /// Defaults: whole collection as one group, sorted by `field` then filename, counting from 1
    pub fn new(field: Field) -> Self {
        Self {
            group_by: Vec::new(),
            sort_by: default_sort(field),
            start: 1,
            increment: 1,
        }
    }

    fn compute<T: TagItem>(&self, items: &[T], index: usize, peers: &[usize]) -> i64 {
        let mut group = peer_group(&self.group_by, items, index, peers);
        if !group.contains(&index) {
            group.push(index);
        }
        group.sort_by(|&a, &b| compare_items(&self.sort_by, &items[a], &items[b]));

        let position = group.iter().position(|&i| i == index).unwrap_or_default();
        self.start + self.increment * position as i64
    }
}

/// Min/max of a source field across an item's peer group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub value_of: Field,
    pub group_by: Vec<Field>,
}

impl Aggregate {
    fn values<'a, T: TagItem>(
        &'a self,
        items: &'a [T],
        index: usize,
        peers: &[usize],
    ) -> impl Iterator<Item = TagValue> + 'a {
        peer_group(&self.group_by, items, index, peers)
            .into_iter()
            .filter_map(move |i| items[i].get(self.value_of))
    }
}

/// How a setter computes its value
#[derive(Debug, Clone)]
pub enum Operation {
    /// Assign a literal
    Value(Option<TagValue>),
    /// Copy another field of the same item
    Field(Field),
    /// Remove the value
    Clear,
    /// Separator-joined text of several getters
    Join { getters: Vec<Getter>, separator: String },
    Incremental(Incremental),
    Min(Aggregate),
    Max(Aggregate),
    Template(Template),
}

impl Operation {
    fn value_from_config(field: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        match config.get("value") {
            Some(value) => Ok(Operation::Value(literal_for_field(field, value)?)),
            None => Err(ConfigError::new("No value given").with_value(Value::Object(config.clone()))),
        }
    }

    fn field_from_config(_: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        match config.get("field") {
            Some(Value::String(name)) => Ok(Operation::Field(Field::from_name(name)?)),
            _ => Err(ConfigError::new("No field given")
                .with_key("field")
                .with_value(Value::Object(config.clone()))),
        }
    }

    fn clear_from_config(field: Field, _: &Map<String, Value>) -> Result<Self, ConfigError> {
        if !field.is_tag() {
            return Err(property_cleared(field));
        }
        Ok(Operation::Clear)
    }

    fn join_from_config(_: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let separator = match config.get("separator") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let getters = match config.get("values") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(getter_from_config)
                .collect::<Result<Vec<_>, _>>()?,
            Some(single) => vec![getter_from_config(single)?],
        };
        Ok(Operation::Join { getters, separator })
    }

    fn incremental_from_config(field: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let sort_by = fields_from_config(config, "sort")?;
        Ok(Operation::Incremental(Incremental {
            group_by: fields_from_config(config, "group")?,
            sort_by: if sort_by.is_empty() {
                default_sort(field)
            } else {
                sort_by
            },
            start: integer_from_config(config, "start", 1)?,
            increment: integer_from_config(config, "increment", 1)?,
        }))
    }

    fn aggregate_from_config(field: Field, config: &Map<String, Value>) -> Result<Aggregate, ConfigError> {
        let value_of = match config.get("field") {
            Some(Value::String(name)) => Field::from_name(name)?,
            None | Some(Value::Null) => field,
            Some(other) => {
                return Err(ConfigError::new("Field must be a field name")
                    .with_key("field")
                    .with_value(other))
            }
        };
        Ok(Aggregate {
            value_of,
            group_by: fields_from_config(config, "group")?,
        })
    }

    fn min_from_config(field: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Self::aggregate_from_config(field, config).map(Operation::Min)
    }

    fn max_from_config(field: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Self::aggregate_from_config(field, config).map(Operation::Max)
    }

    fn template_from_config(_: Field, config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let source = match config.get("template") {
            Some(Value::String(source)) => source.clone(),
            _ => {
                return Err(ConfigError::new("No template given")
                    .with_key("template")
                    .with_value(Value::Object(config.clone())))
            }
        };

        let getters = config
            .iter()
            .filter(|(key, _)| !TEMPLATE_RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| Ok((key.clone(), getter_from_config(value)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Operation::Template(Template::new(source, getters)?))
    }

    /// Names accepted by the `operation` key
    pub fn registered() -> impl Iterator<Item = &'static str> {
        SETTERS.iter().map(|(name, _)| *name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |fields: &[Field]| {
            fields
                .iter()
                .map(Field::name)
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            Operation::Value(Some(value)) => write!(f, "'{}'", value),
            Operation::Value(None) => write!(f, "none"),
            Operation::Field(field) => write!(f, "value of {}", field),
            Operation::Clear => write!(f, "clear"),
            Operation::Join { getters, separator } => {
                let getters: Vec<String> = getters.iter().map(ToString::to_string).collect();
                write!(f, "join [{}] with '{}'", getters.join(", "), separator)
            }
            Operation::Incremental(op) => {
                write!(f, "incremental from {} by {}", op.start, op.increment)?;
                if !op.group_by.is_empty() {
                    write!(f, " grouped by [{}]", names(&op.group_by))?;
                }
                write!(f, " sorted by [{}]", names(&op.sort_by))
            }
            Operation::Min(op) | Operation::Max(op) => {
                let kind = if matches!(self, Operation::Min(_)) { "min" } else { "max" };
                write!(f, "{} of {}", kind, op.value_of)?;
                if !op.group_by.is_empty() {
                    write!(f, " grouped by [{}]", names(&op.group_by))?;
                }
                Ok(())
            }
            Operation::Template(template) => write!(f, "template {}", template),
        }
    }
}

fn default_sort(field: Field) -> Vec<Field> {
    if field == Field::Filename {
        vec![field]
    } else {
        vec![field, Field::Filename]
    }
}

/// Read a list of group/sort field names from `key`
fn fields_from_config(config: &Map<String, Value>, key: &str) -> Result<Vec<Field>, ConfigError> {
    let names: Vec<&str> = match config.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value.as_str().ok_or_else(|| {
                    ConfigError::new("Expected a field name")
                        .with_key(key)
                        .with_value(value)
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ConfigError::new("Expected a field name or list of field names")
                .with_key(key)
                .with_value(other))
        }
    };

    let fields = Field::from_names(&names).map_err(|e| e.with_key(key))?;
    if let Some(field) = fields.iter().find(|field| !field.is_sortable()) {
        return Err(ConfigError::new("Field cannot be used to group or sort items")
            .with_key(key)
            .with_value(field));
    }
    Ok(fields)
}

fn integer_from_config(config: &Map<String, Value>, key: &str, default: i64) -> Result<i64, ConfigError> {
    let invalid = |value: &Value| {
        ConfigError::new("Expected an integer")
            .with_key(key)
            .with_value(value)
    };

    match config.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value @ Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(value)),
        Some(value @ Value::String(s)) => s.trim().parse().map_err(|_| invalid(value)),
        Some(other) => Err(invalid(other)),
    }
}

/// A literal converted to the kind of `field`
///
/// Fails when the literal cannot be stored in the field, or when it is
/// `null` and the field is a file property.
fn literal_for_field(field: Field, literal: &Value) -> Result<Option<TagValue>, ConfigError> {
    let Some(raw) = TagValue::from_literal(literal).map_err(|e| e.with_key(field.name()))? else {
        if !field.is_tag() {
            return Err(property_cleared(field));
        }
        return Ok(None);
    };
    match raw.coerce(field.kind()) {
        Some(value) => Ok(Some(value)),
        None => Err(ConfigError::new("Value cannot be stored in this field")
            .with_key(field.name())
            .with_value(literal)),
    }
}

fn property_cleared(field: Field) -> ConfigError {
    ConfigError::new("File properties cannot be cleared")
        .with_key(field.name())
        .with_value("clear")
}

/// Peers sharing every `group_by` value with the item at `index`
fn peer_group<T: TagItem>(group_by: &[Field], items: &[T], index: usize, peers: &[usize]) -> Vec<usize> {
    let keys: Vec<Option<TagValue>> = group_by.iter().map(|field| items[index].get(*field)).collect();
    peers
        .iter()
        .copied()
        .filter(|&i| i < items.len())
        .filter(|&i| {
            group_by
                .iter()
                .zip(&keys)
                .all(|(field, key)| items[i].get(*field) == *key)
        })
        .collect()
}

/// Sort-key ordering: text ignores case, absent values sort last
fn compare_items<T: TagItem>(sort_by: &[Field], a: &T, b: &T) -> Ordering {
    for field in sort_by {
        let ordering = match (a.get(*field), b.get(*field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(TagValue::Text(a)), Some(TagValue::Text(b))) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Some(a), Some(b)) => a.cmp(&b),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Assigns one field on items matching its condition
#[derive(Debug, Clone)]
pub struct Setter {
    pub field: Field,
    pub condition: ConditionFilter,
    pub operation: Operation,
}

impl Setter {
    pub fn new(field: Field, operation: Operation) -> Self {
        Self {
            field,
            condition: ConditionFilter::default(),
            operation,
        }
    }

    pub fn with_condition(mut self, condition: ConditionFilter) -> Self {
        self.condition = condition;
        self
    }

    /// Compute the new value for `items[index]`; `None` leaves the item untouched
    fn evaluate<T: TagItem>(&self, items: &[T], index: usize, peers: &[usize]) -> Option<Option<TagValue>> {
        let item = &items[index];
        match &self.operation {
            Operation::Value(value) => Some(value.clone()),
            Operation::Field(value_of) => Some(item.get(*value_of)),
            Operation::Clear => Some(None),
            Operation::Join { getters, separator } => {
                let values: Vec<String> = getters
                    .iter()
                    .map(|getter| getter.get(item).map(|v| v.to_string()).unwrap_or_default())
                    .collect();
                Some(Some(TagValue::Text(values.join(separator))))
            }
            Operation::Incremental(op) => Some(Some(TagValue::Integer(op.compute(items, index, peers)))),
            Operation::Min(op) => op.values(items, index, peers).min().map(Some),
            Operation::Max(op) => op.values(items, index, peers).max().map(Some),
            Operation::Template(template) => Some(Some(TagValue::Text(template.render(item)))),
        }
    }

    /// Set the field on `items[index]`, using `peers` (indices into `items`) as its group
    ///
    /// Leaves the item untouched when the condition fails or a group
    /// operation has no values to work with.
    pub fn set<T: TagItem>(&self, items: &mut [T], index: usize, peers: &[usize]) {
        let Some(item) = items.get(index) else {
            return;
        };
        if !self.condition.matches(item) {
            return;
        }

        if let Some(value) = self.evaluate(items, index, peers) {
            trace!(
                path = %items[index].path().display(),
                field = %self.field,
                value = ?value,
                "Setting tag"
            );
            items[index].set(self.field, value);
        }
    }

    /// Set the field on a single item with no peers
    pub fn set_item<T: TagItem>(&self, item: &mut T) {
        self.set(std::slice::from_mut(item), 0, &[0]);
    }
}

impl fmt::Display for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.field, self.operation)?;
        if self.condition.is_ready() {
            write!(f, " when {}", self.condition)?;
        }
        Ok(())
    }
}

/// Build the setter for target `field` from its config
///
/// Non-mapping config is a literal value. A mapping is dispatched on its
/// `operation` key; without a recognised operation it falls back to a
/// literal (`value` key) or a field copy (`field` key).
pub fn setter_from_config(field: Field, config: &Value) -> Result<Setter, ConfigError> {
    let map = match config {
        Value::Object(map) => map,
        literal => {
            return Ok(Setter::new(
                field,
                Operation::Value(literal_for_field(field, literal)?),
            ))
        }
    };

    let condition = ConditionFilter::from_config(map.get("when"))?;
    let operation_name = map
        .get("operation")
        .and_then(Value::as_str)
        .map(|name| name.trim().to_lowercase());
    let constructor = operation_name
        .as_deref()
        .and_then(|name| SETTERS.iter().find(|(key, _)| *key == name));

    let operation = match constructor {
        Some((_, build)) => build(field, map)?,
        None if map.contains_key("value") => Operation::value_from_config(field, map)?,
        None if map.contains_key("field") => Operation::field_from_config(field, map)?,
        None => {
            let valid: Vec<&str> = Operation::registered().collect();
            return Err(ConfigError::new(format!(
                "Unrecognised operation. Valid operations: {}",
                valid.join(", ")
            ))
            .with_key("operation")
            .with_value(operation_name.as_deref().unwrap_or("none")));
        }
    };

    Ok(Setter {
        field,
        condition,
        operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Comparer, Condition};
    use crate::tagger::getter::TagGetter;
    use crate::track::Track;
    use serde_json::json;

    fn track() -> Track {
        Track::new("/music/Artist/Album/01 - Song.flac")
            .with(Field::Title, "Song")
            .with(Field::Artist, "Artist")
            .with(Field::Album, "Album")
            .with(Field::Year, 2020_i64)
            .with(Field::TrackNumber, 1_i64)
            .with(Field::Genres, TagValue::List(vec!["Rock".into()]))
    }

    /// Ten tracks over two albums, tracks 1-5 in reverse file order
    fn album_tracks() -> Vec<Track> {
        let mut tracks = Vec::new();
        for album in ["A", "B"] {
            for n in (1..=5_i64).rev() {
                tracks.push(
                    Track::new(format!("/music/{album}/{n:02}.flac"))
                        .with(Field::Album, album)
                        .with(Field::Title, format!("{album}{n}"))
                        .with(Field::TrackNumber, n * 10)
                        .with(Field::DiscNumber, if n > 3 { 2_i64 } else { 1_i64 }),
                );
            }
        }
        tracks
    }

    fn artist_condition() -> ConditionFilter {
        let expected = vec!["this".into(), "or".into(), "that".into()];
        let comparer = Comparer::new(Condition::IsIn, expected, Some(Field::Artist)).unwrap();
        ConditionFilter::single(comparer)
    }

    #[test]
    fn test_literal_config_is_value_setter() {
        let setter = setter_from_config(Field::Compilation, &json!(true)).unwrap();
        assert!(matches!(setter.operation, Operation::Value(Some(TagValue::Bool(true)))));
        assert!(!setter.condition.is_ready());
    }

    #[test]
    fn test_unrecognised_operation() {
        let err = setter_from_config(Field::Title, &json!({"operation": "i am an invalid operation"}))
            .unwrap_err();
        assert_eq!(err.key.as_deref(), Some("operation"));
        assert_eq!(err.value.as_deref(), Some("i am an invalid operation"));
        assert!(err.message.contains("incremental"));
    }

    #[test]
    fn test_fallback_to_value_and_field() {
        let setter = setter_from_config(Field::Title, &json!({"value": "i am a value"})).unwrap();
        assert!(matches!(
            setter.operation,
            Operation::Value(Some(ref v)) if *v == TagValue::from("i am a value")
        ));

        let setter = setter_from_config(Field::Title, &json!({"field": "disc_number"})).unwrap();
        assert!(matches!(setter.operation, Operation::Field(Field::DiscNumber)));
    }

    #[test]
    fn test_condition_from_config() {
        let config = json!({"operation": "clear", "when": {"field": "track_number", "greater_than": 2}});
        let setter = setter_from_config(Field::Title, &config).unwrap();
        let comparer = &setter.condition.comparers[0];
        assert_eq!(comparer.field, Some(Field::TrackNumber));
        assert_eq!(comparer.condition, Condition::GreaterThan);
        assert_eq!(comparer.expected, vec![TagValue::Integer(2)]);
    }

    #[test]
    fn test_value_set() {
        let mut track = track();
        Setter::new(Field::Title, Operation::Value(Some("i am a value".into()))).set_item(&mut track);
        assert_eq!(track.get(Field::Title), Some("i am a value".into()));
    }

    #[test]
    fn test_field_set_copies_across_kinds() {
        let mut track = track();
        Setter::new(Field::Title, Operation::Field(Field::Year)).set_item(&mut track);
        assert_eq!(track.get(Field::Title), Some("2020".into()));
    }

    #[test]
    fn test_clear_set() {
        let mut track = track();
        for field in [Field::Title, Field::Year, Field::Artist, Field::Genres] {
            let setter = setter_from_config(field, &json!({"operation": "clear"})).unwrap();
            setter.set_item(&mut track);
            assert_eq!(track.get(field), None);
        }
    }

    #[test]
    fn test_repeated_set_is_idempotent() {
        let operations = vec![
            Operation::Field(Field::Album),
            Operation::Clear,
            Operation::Value(Some("new".into())),
        ];
        for operation in operations {
            let setter = Setter::new(Field::Title, operation);
            let mut once = track();
            setter.set_item(&mut once);
            let mut twice = once.clone();
            setter.set_item(&mut twice);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_value_must_fit_field_kind() {
        let err = setter_from_config(Field::Year, &json!("this")).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("year"));
        assert_eq!(err.value.as_deref(), Some("\"this\""));

        let err = setter_from_config(Field::TrackNumber, &json!({"value": [1, 2]})).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("track_number"));

        let setter = setter_from_config(Field::Year, &json!("1999")).unwrap();
        let mut track = track();
        setter.set_item(&mut track);
        assert_eq!(track.get(Field::Year), Some(TagValue::Integer(1999)));
    }

    #[test]
    fn test_clearing_file_property_rejected() {
        for field in [Field::Path, Field::Folder, Field::Filename, Field::Ext] {
            let err = setter_from_config(field, &json!({"operation": "clear"})).unwrap_err();
            assert_eq!(err.key.as_deref(), Some(field.name()));
            assert!(setter_from_config(field, &json!(null)).is_err());
        }
        assert!(setter_from_config(Field::Filename, &json!("renamed")).is_ok());
    }

    #[test]
    fn test_condition_gates_every_operation() {
        let operations = vec![
            Operation::Value(Some("new".into())),
            Operation::Field(Field::Album),
            Operation::Clear,
            Operation::Template(Template::new("{album}!", Vec::new()).unwrap()),
            Operation::Join {
                getters: vec![Getter::Tag(TagGetter::new(Field::Album))],
                separator: "-".into(),
            },
            Operation::Incremental(Incremental::new(Field::Title)),
            Operation::Min(Aggregate {
                value_of: Field::Album,
                group_by: Vec::new(),
            }),
            Operation::Max(Aggregate {
                value_of: Field::Year,
                group_by: Vec::new(),
            }),
        ];
        for operation in operations {
            let setter = Setter::new(Field::Title, operation).with_condition(artist_condition());

            let mut unmatched = track();
            setter.set_item(&mut unmatched);
            assert_eq!(unmatched.get(Field::Title), Some("Song".into()));

            let mut matched = track();
            matched.set(Field::Artist, Some("that".into()));
            setter.set_item(&mut matched);
            assert_ne!(matched.get(Field::Title), Some("Song".into()));
        }
    }

    #[test]
    fn test_join_from_config_defaults() {
        let setter = setter_from_config(Field::Album, &json!({"operation": "join"})).unwrap();
        let Operation::Join { getters, separator } = setter.operation else {
            panic!("expected join");
        };
        assert!(getters.is_empty());
        assert_eq!(separator, "");
    }

    #[test]
    fn test_join_set() {
        let getters = vec![
            Getter::Tag(TagGetter::new(Field::Album)),
            Getter::Tag(TagGetter::new(Field::Title)),
            Getter::Tag(TagGetter::new(Field::Ext)),
        ];
        let setter = Setter::new(
            Field::Artist,
            Operation::Join {
                getters,
                separator: "-".into(),
            },
        );
        let mut track = track();
        setter.set_item(&mut track);
        assert_eq!(track.get(Field::Artist), Some("Album-Song-.flac".into()));
    }

    #[test]
    fn test_join_renders_missing_as_empty() {
        let config = json!({"operation": "join", "separator": "/", "values": ["album", "key", "title"]});
        let setter = setter_from_config(Field::Comments, &config).unwrap();
        let mut track = track();
        setter.set_item(&mut track);
        assert_eq!(
            track.get(Field::Comments),
            Some(TagValue::List(vec!["Album//Song".into()]))
        );
    }

    #[test]
    fn test_incremental_from_config() {
        let setter = setter_from_config(Field::DiscNumber, &json!({"operation": "incremental"})).unwrap();
        let Operation::Incremental(op) = setter.operation else {
            panic!("expected incremental");
        };
        assert_eq!(op.sort_by, vec![Field::DiscNumber, Field::Filename]);
        assert_eq!((op.start, op.increment), (1, 1));

        let config = json!({
            "operation": "incremental",
            "start": -5,
            "increment": "-1",
            "sort": ["artist"],
            "group": ["album", "title", "ext"],
        });
        let setter = setter_from_config(Field::Title, &config).unwrap();
        let Operation::Incremental(op) = setter.operation else {
            panic!("expected incremental");
        };
        assert_eq!(op.sort_by, vec![Field::Artist]);
        assert_eq!(op.group_by, vec![Field::Album, Field::Title, Field::Ext]);
        assert_eq!((op.start, op.increment), (-5, -1));
    }

    #[test]
    fn test_unsortable_group_rejected() {
        let config = json!({"operation": "incremental", "group": ["album", "genres"]});
        let err = setter_from_config(Field::TrackNumber, &config).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("group"));
        assert_eq!(err.value.as_deref(), Some("genres"));
    }

    #[test]
    fn test_incremental_set_no_group() {
        let mut tracks = album_tracks();
        let peers: Vec<usize> = (0..tracks.len()).collect();
        let setter = setter_from_config(
            Field::TrackNumber,
            &json!({"operation": "incremental", "sort": ["album", "filename"], "start": -2, "increment": 3}),
        )
        .unwrap();

        // index 0 is album A file 05, sorted position 4
        setter.set(&mut tracks, 0, &peers);
        assert_eq!(tracks[0].get(Field::TrackNumber), Some(TagValue::Integer(-2 + 4 * 3)));

        // index 9 is album B file 01, sorted position 5
        setter.set(&mut tracks, 9, &peers);
        assert_eq!(tracks[9].get(Field::TrackNumber), Some(TagValue::Integer(-2 + 5 * 3)));
    }

    #[test]
    fn test_incremental_set_with_group() {
        let mut tracks = album_tracks();
        let peers: Vec<usize> = (0..tracks.len()).collect();
        let setter = setter_from_config(
            Field::TrackNumber,
            &json!({"operation": "incremental", "group": ["album", "disc_number"], "sort": "filename"}),
        )
        .unwrap();

        for index in 0..tracks.len() {
            setter.set(&mut tracks, index, &peers);
        }
        let numbers: Vec<Option<TagValue>> = tracks.iter().map(|t| t.get(Field::TrackNumber)).collect();
        let expected: Vec<Option<TagValue>> = [2, 1, 3, 2, 1, 2, 1, 3, 2, 1]
            .into_iter()
            .map(|n: i64| Some(TagValue::Integer(n)))
            .collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_incremental_item_outside_peers_counts_from_start() {
        let mut tracks = album_tracks();
        let setter = Setter::new(Field::TrackNumber, Operation::Incremental(Incremental::new(Field::TrackNumber)));
        setter.set(&mut tracks, 3, &[]);
        assert_eq!(tracks[3].get(Field::TrackNumber), Some(TagValue::Integer(1)));
    }

    #[test]
    fn test_aggregate_from_config() {
        let setter = setter_from_config(Field::TrackNumber, &json!({"operation": "max"})).unwrap();
        let Operation::Max(op) = setter.operation else {
            panic!("expected max");
        };
        assert_eq!(op.value_of, Field::TrackNumber);
        assert!(op.group_by.is_empty());

        let config = json!({"operation": "min", "field": "track_total", "group": ["album", "artist", "disc_number"]});
        let setter = setter_from_config(Field::TrackNumber, &config).unwrap();
        let Operation::Min(op) = setter.operation else {
            panic!("expected min");
        };
        assert_eq!(op.value_of, Field::TrackTotal);
        assert_eq!(op.group_by, vec![Field::Album, Field::Artist, Field::DiscNumber]);
    }

    #[test]
    fn test_min_max_set_no_group() {
        let mut tracks = album_tracks();
        let peers: Vec<usize> = (0..tracks.len()).collect();
        let min = setter_from_config(Field::TrackTotal, &json!({"operation": "min", "field": "track_number"})).unwrap();
        let max = setter_from_config(Field::DiscTotal, &json!({"operation": "max", "field": "disc_number"})).unwrap();

        min.set(&mut tracks, 2, &peers);
        max.set(&mut tracks, 2, &peers);
        assert_eq!(tracks[2].get(Field::TrackTotal), Some(TagValue::Integer(10)));
        assert_eq!(tracks[2].get(Field::DiscTotal), Some(TagValue::Integer(2)));
    }

    #[test]
    fn test_min_max_set_with_group() {
        let mut tracks = album_tracks();
        let peers: Vec<usize> = (0..tracks.len()).collect();
        let config = json!({"operation": "max", "field": "track_number", "group": ["album", "disc_number"]});
        let setter = setter_from_config(Field::TrackTotal, &config).unwrap();

        for index in 0..tracks.len() {
            setter.set(&mut tracks, index, &peers);
        }
        let totals: Vec<Option<TagValue>> = tracks.iter().map(|t| t.get(Field::TrackTotal)).collect();
        let expected: Vec<Option<TagValue>> = [50, 50, 30, 30, 30, 50, 50, 30, 30, 30]
            .into_iter()
            .map(|n: i64| Some(TagValue::Integer(n)))
            .collect();
        assert_eq!(totals, expected);
    }

    #[test]
    fn test_min_max_no_values_leaves_item_unchanged() {
        let mut tracks = album_tracks();
        let peers: Vec<usize> = (0..tracks.len()).collect();
        let setter = setter_from_config(Field::TrackNumber, &json!({"operation": "min", "field": "bpm"})).unwrap();
        setter.set(&mut tracks, 0, &peers);
        assert_eq!(tracks[0].get(Field::TrackNumber), Some(TagValue::Integer(50)));
        assert!(!tracks[0].is_changed());

        let setter = setter_from_config(Field::TrackNumber, &json!({"operation": "max"})).unwrap();
        setter.set(&mut tracks, 0, &[]);
        assert_eq!(tracks[0].get(Field::TrackNumber), Some(TagValue::Integer(50)));
    }

    #[test]
    fn test_template_from_config() {
        let config = json!({
            "operation": "template",
            "template": "{album} - {folder_name} - {new_value}",
            "folder_name": {"field": "path", "parent": 1},
            "new_value": {"field": "year", "when": {"field": "year", "greater_than": 2000}},
        });
        let setter = setter_from_config(Field::Title, &config).unwrap();
        let mut track = track();
        setter.set_item(&mut track);
        assert_eq!(track.get(Field::Title), Some("Album - Album - 2020".into()));
    }

    #[test]
    fn test_template_requires_template() {
        let err = setter_from_config(Field::Title, &json!({"operation": "template"})).unwrap_err();
        assert_eq!(err.message, "No template given");
    }

    #[test]
    fn test_template_unconfigured_placeholder_rejected() {
        let config = json!({"operation": "template", "template": "{title} {new_value}"});
        let err = setter_from_config(Field::Title, &config).unwrap_err();
        assert!(err.message.ends_with(": new_value"));
    }

    #[test]
    fn test_display() {
        let config = json!({"operation": "incremental", "group": "album", "sort": "filename"});
        let setter = setter_from_config(Field::TrackNumber, &config).unwrap();
        assert_eq!(
            setter.to_string(),
            "track_number = incremental from 1 by 1 grouped by [album] sorted by [filename]"
        );
    }
}
