//! Value getters
//!
//! A [`Getter`] extracts one value from an item: a tag lookup (optionally
//! zero-padded), a conditional lookup with a literal fallback, or a
//! segment of the item's file path.

use crate::error::ConfigError;
use crate::field::Field;
use crate::filter::ConditionFilter;
use crate::track::TagItem;
use crate::value::TagValue;
use serde_json::{Map, Value};
use std::fmt;

type GetterConstructor = fn(&Map<String, Value>) -> Result<Getter, ConfigError>;

/// Getter types selected by the `field` key instead of a tag field
const GETTERS: &[(&str, GetterConstructor)] = &[("path", PathGetter::build)];

/// Width to zero-pad a value to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadingZeros {
    /// Fixed width
    Width(usize),
    /// Width of another field's value on the same item (0 when absent)
    LengthOf(Field),
}

impl LeadingZeros {
    fn from_config(config: &Map<String, Value>) -> Result<Option<Self>, ConfigError> {
        let invalid = |value: &Value| {
            ConfigError::new("Leading zeros must be a non-negative width or a field name")
                .with_key("leading_zeros")
                .with_value(value)
        };

        match config.get("leading_zeros") {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Number(n)) => match n.as_u64() {
                Some(width) => Ok(Some(LeadingZeros::Width(width as usize))),
                None => Err(invalid(value)),
            },
            Some(value @ Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(width) if width >= 0 => Ok(Some(LeadingZeros::Width(width as usize))),
                Ok(_) => Err(invalid(value)),
                Err(_) => Field::from_name(s)
                    .map(|field| Some(LeadingZeros::LengthOf(field)))
                    .map_err(|e| e.with_key("leading_zeros")),
            },
            Some(other) => Err(invalid(other)),
        }
    }

    fn width<T: TagItem>(&self, item: &T) -> usize {
        match self {
            LeadingZeros::Width(width) => *width,
            LeadingZeros::LengthOf(field) => item
                .get(*field)
                .map_or(0, |value| value.to_string().chars().count()),
        }
    }
}

/// Left-pad `value` with zeros to `width` characters, keeping a leading sign first
pub fn zero_pad(value: &str, width: usize) -> String {
    let length = value.chars().count();
    if length >= width {
        return value.to_string();
    }

    let padding = "0".repeat(width - length);
    match value.strip_prefix(['-', '+']) {
        Some(rest) => format!("{}{}{}", &value[..1], padding, rest),
        None => format!("{}{}", padding, value),
    }
}

/// Reads a tag field from the item
#[derive(Debug, Clone)]
pub struct TagGetter {
    pub field: Field,
    pub leading_zeros: Option<LeadingZeros>,
}

impl TagGetter {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            leading_zeros: None,
        }
    }

    pub fn with_leading_zeros(mut self, leading_zeros: LeadingZeros) -> Self {
        self.leading_zeros = Some(leading_zeros);
        self
    }

    /// Shorthand config: a bare field name
    pub fn from_field(name: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(Field::from_name(name)?))
    }

    pub fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let field = match config.get("field") {
            Some(Value::String(name)) => Field::from_name(name)?,
            _ => {
                return Err(ConfigError::new("No field given")
                    .with_key("field")
                    .with_value(Value::Object(config.clone())))
            }
        };

        Ok(Self {
            field,
            leading_zeros: LeadingZeros::from_config(config)?,
        })
    }

    pub fn get<T: TagItem>(&self, item: &T) -> Option<TagValue> {
        let value = item.get(self.field)?;
        match &self.leading_zeros {
            Some(leading_zeros) => Some(TagValue::Text(zero_pad(
                &value.to_string(),
                leading_zeros.width(item),
            ))),
            None => Some(value),
        }
    }
}

/// A getter gated by a condition, returning a literal when no field is set
#[derive(Debug, Clone)]
pub struct ConditionalGetter {
    pub condition: ConditionFilter,
    pub field: Option<Field>,
    pub value: Option<TagValue>,
    pub leading_zeros: Option<LeadingZeros>,
}

impl ConditionalGetter {
    pub fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let condition = ConditionFilter::from_config(config.get("when"))?;

        let field = match config.get("field") {
            Some(Value::String(name)) if !name.is_empty() => Some(Field::from_name(name)?),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(other) => {
                return Err(ConfigError::new("Field must be a field name")
                    .with_key("field")
                    .with_value(other))
            }
        };

        let value = match config.get("value") {
            Some(literal) => TagValue::from_literal(literal).map_err(|e| e.with_key("value"))?,
            None => Some(TagValue::Text(String::new())),
        };

        Ok(Self {
            condition,
            field,
            value,
            leading_zeros: LeadingZeros::from_config(config)?,
        })
    }

    pub fn get<T: TagItem>(&self, item: &T) -> Option<TagValue> {
        if !self.condition.matches(item) {
            return None;
        }

        match self.field {
            Some(field) => TagGetter {
                field,
                leading_zeros: self.leading_zeros,
            }
            .get(item),
            None => self.value.clone(),
        }
    }
}

/// Returns a segment of the item's path counted back from the file name
///
/// `parent = 0` is the file name itself, `1` its directory and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathGetter {
    pub parent: usize,
}

impl PathGetter {
    pub fn new(parent: i64) -> Result<Self, ConfigError> {
        if parent < 0 {
            return Err(ConfigError::new("Parent value must be >= 0")
                .with_key("parent")
                .with_value(parent));
        }
        Ok(Self {
            parent: parent as usize,
        })
    }

    pub fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let parent = match config.get("parent") {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or_default(),
            Some(value @ Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
                ConfigError::new("Parent value must be an integer")
                    .with_key("parent")
                    .with_value(value)
            })?,
            Some(other) => {
                return Err(ConfigError::new("Parent value must be an integer")
                    .with_key("parent")
                    .with_value(other))
            }
        };
        Self::new(parent)
    }

    fn build(config: &Map<String, Value>) -> Result<Getter, ConfigError> {
        Self::from_config(config).map(Getter::Path)
    }

    /// `None` when the path has fewer segments than `parent + 1`
    pub fn get<T: TagItem>(&self, item: &T) -> Option<TagValue> {
        item.path()
            .iter()
            .rev()
            .nth(self.parent)
            .map(|segment| TagValue::Text(segment.to_string_lossy().to_string()))
    }
}

/// Any configured getter
#[derive(Debug, Clone)]
pub enum Getter {
    Tag(TagGetter),
    Conditional(ConditionalGetter),
    Path(PathGetter),
}

impl Getter {
    pub fn get<T: TagItem>(&self, item: &T) -> Option<TagValue> {
        match self {
            Getter::Tag(getter) => getter.get(item),
            Getter::Conditional(getter) => getter.get(item),
            Getter::Path(getter) => getter.get(item),
        }
    }

    /// Names of the getter types selected through the `field` key
    pub fn registered() -> impl Iterator<Item = &'static str> {
        GETTERS.iter().map(|(name, _)| *name)
    }
}

impl From<TagGetter> for Getter {
    fn from(getter: TagGetter) -> Self {
        Getter::Tag(getter)
    }
}

impl From<PathGetter> for Getter {
    fn from(getter: PathGetter) -> Self {
        Getter::Path(getter)
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Getter::Tag(getter) => write!(f, "{}", getter.field),
            Getter::Conditional(getter) => {
                match (&getter.field, &getter.value) {
                    (Some(field), _) => write!(f, "{}", field)?,
                    (None, Some(value)) => write!(f, "'{}'", value)?,
                    (None, None) => write!(f, "none")?,
                }
                write!(f, " when {}", getter.condition)
            }
            Getter::Path(getter) => write!(f, "path[parent={}]", getter.parent),
        }
    }
}

/// Build a getter from its config
///
/// A bare string is a field name. A mapping with a `when` key is a
/// conditional getter; a mapping whose `field` names a registered getter
/// type builds that type; any other mapping reads a tag field.
pub fn getter_from_config(config: &Value) -> Result<Getter, ConfigError> {
    let map = match config {
        Value::String(name) => return TagGetter::from_field(name).map(Getter::Tag),
        Value::Object(map) => map,
        other => {
            return Err(ConfigError::new("Getter must be a field name or a mapping")
                .with_value(other))
        }
    };

    if map.contains_key("when") {
        return ConditionalGetter::from_config(map).map(Getter::Conditional);
    }

    let registered = map
        .get("field")
        .and_then(Value::as_str)
        .and_then(|name| GETTERS.iter().find(|(key, _)| *key == name.trim().to_lowercase()));
    match registered {
        Some((_, build)) => build(map),
        None => TagGetter::from_config(map).map(Getter::Tag),
    }
}
