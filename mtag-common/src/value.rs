//! Tag values
//!
//! A single owned value type for every field so getters, setters and
//! filters can move values between fields of different kinds.

use crate::error::ConfigError;
use crate::field::{Field, FieldKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A value held by a track field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl TagValue {
    fn rank(&self) -> u8 {
        match self {
            TagValue::Bool(_) => 0,
            TagValue::Integer(_) | TagValue::Float(_) => 1,
            TagValue::Text(_) => 2,
            TagValue::List(_) => 3,
        }
    }

    /// Build a value from a config literal, keeping the literal's own kind
    ///
    /// `null` yields `None`. Mappings and nested lists are rejected.
    pub fn from_literal(value: &serde_json::Value) -> Result<Option<Self>, ConfigError> {
        let parsed = match value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Bool(b) => TagValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => TagValue::Integer(i),
                None => TagValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => TagValue::Text(s.clone()),
            serde_json::Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => list.push(s.clone()),
                        serde_json::Value::Null => {}
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            return Err(ConfigError::new("Nested values are not supported")
                                .with_value(value));
                        }
                        other => list.push(other.to_string()),
                    }
                }
                TagValue::List(list)
            }
            serde_json::Value::Object(_) => {
                return Err(ConfigError::new("Mappings cannot be used as a tag value")
                    .with_value(value));
            }
        };
        Ok(Some(parsed))
    }

    /// Build a value for `field` from a config literal
    ///
    /// Coercion is lenient: a literal that does not parse as the field's
    /// kind keeps its own kind. `null` yields `None`.
    pub fn from_json(field: Field, value: &serde_json::Value) -> Result<Option<Self>, ConfigError> {
        let Some(raw) = Self::from_literal(value).map_err(|e| e.with_key(field.name()))? else {
            return Ok(None);
        };
        Ok(Some(raw.clone().coerce(field.kind()).unwrap_or(raw)))
    }

    /// Convert this value into the given kind, if possible
    pub fn coerce(self, kind: FieldKind) -> Option<Self> {
        match (kind, self) {
            (FieldKind::Text, TagValue::Text(s)) => Some(TagValue::Text(s)),
            (FieldKind::Text, other) => Some(TagValue::Text(other.to_string())),

            (FieldKind::Integer, TagValue::Integer(i)) => Some(TagValue::Integer(i)),
            (FieldKind::Integer, TagValue::Float(f)) if f.fract() == 0.0 => {
                Some(TagValue::Integer(f as i64))
            }
            (FieldKind::Integer, TagValue::Bool(b)) => Some(TagValue::Integer(b as i64)),
            (FieldKind::Integer, TagValue::Text(s)) => {
                s.trim().parse::<i64>().ok().map(TagValue::Integer)
            }
            (FieldKind::Integer, _) => None,

            (FieldKind::Float, TagValue::Float(f)) => Some(TagValue::Float(f)),
            (FieldKind::Float, TagValue::Integer(i)) => Some(TagValue::Float(i as f64)),
            (FieldKind::Float, TagValue::Text(s)) => s.trim().parse::<f64>().ok().map(TagValue::Float),
            (FieldKind::Float, _) => None,

            (FieldKind::Bool, TagValue::Bool(b)) => Some(TagValue::Bool(b)),
            (FieldKind::Bool, TagValue::Integer(i)) => Some(TagValue::Bool(i != 0)),
            (FieldKind::Bool, TagValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(TagValue::Bool(true)),
                "false" | "no" | "0" => Some(TagValue::Bool(false)),
                _ => None,
            },
            (FieldKind::Bool, _) => None,

            (FieldKind::List, TagValue::List(list)) => Some(TagValue::List(list)),
            (FieldKind::List, other) => Some(TagValue::List(vec![other.to_string()])),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// True for empty text and empty lists
    pub fn is_empty(&self) -> bool {
        match self {
            TagValue::Text(s) => s.is_empty(),
            TagValue::List(list) => list.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Integer(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Integer(i) => write!(f, "{}", i),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(s) => write!(f, "{}", s),
            TagValue::List(list) => write!(f, "{}", list.join(", ")),
        }
    }
}

impl Ord for TagValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TagValue::Bool(a), TagValue::Bool(b)) => a.cmp(b),
            (TagValue::Integer(a), TagValue::Integer(b)) => a.cmp(b),
            (TagValue::Float(a), TagValue::Float(b)) => a.total_cmp(b),
            (TagValue::Integer(a), TagValue::Float(b)) => (*a as f64).total_cmp(b),
            (TagValue::Float(a), TagValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (TagValue::Text(a), TagValue::Text(b)) => a.cmp(b),
            (TagValue::List(a), TagValue::List(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for TagValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TagValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TagValue {}
