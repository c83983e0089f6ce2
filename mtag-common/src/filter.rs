//! Condition filters
//!
//! A [`ConditionFilter`] is a set of [`Comparer`]s evaluated against an
//! item. Comparers combine with AND (`match_all`) or OR. A filter with no
//! comparers matches every item.
//!
//! Config shapes accepted by [`ConditionFilter::from_config`]:
//! - `null` / missing: always match
//! - `"value"`: the item's title `is` the value
//! - `["a", "b"]`: the item's title `is_in` the list
//! - `{field: album, match_all: false, is: X, starts_with: Y}`: one
//!   comparer per condition key, all on the named field

use crate::error::ConfigError;
use crate::field::Field;
use crate::track::TagItem;
use crate::value::TagValue;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::fmt;

/// Default for [`ConditionFilter::match_all`]
pub const DEFAULT_MATCH_ALL: bool = true;

/// Named comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Is,
    IsNot,
    IsIn,
    IsNotIn,
    GreaterThan,
    LessThan,
    InRange,
    NotInRange,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    MatchesRegEx,
    MatchesRegExIgnoreCase,
}

impl Condition {
    pub fn all_variants() -> &'static [Condition] {
        &[
            Condition::Is,
            Condition::IsNot,
            Condition::IsIn,
            Condition::IsNotIn,
            Condition::GreaterThan,
            Condition::LessThan,
            Condition::InRange,
            Condition::NotInRange,
            Condition::IsNull,
            Condition::IsNotNull,
            Condition::StartsWith,
            Condition::EndsWith,
            Condition::Contains,
            Condition::DoesNotContain,
            Condition::MatchesRegEx,
            Condition::MatchesRegExIgnoreCase,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Condition::Is => "is",
            Condition::IsNot => "is_not",
            Condition::IsIn => "is_in",
            Condition::IsNotIn => "is_not_in",
            Condition::GreaterThan => "greater_than",
            Condition::LessThan => "less_than",
            Condition::InRange => "in_range",
            Condition::NotInRange => "not_in_range",
            Condition::IsNull => "is_null",
            Condition::IsNotNull => "is_not_null",
            Condition::StartsWith => "starts_with",
            Condition::EndsWith => "ends_with",
            Condition::Contains => "contains",
            Condition::DoesNotContain => "does_not_contain",
            Condition::MatchesRegEx => "matches_reg_ex",
            Condition::MatchesRegExIgnoreCase => "matches_reg_ex_ignore_case",
        }
    }

    /// Parse a condition name, e.g. `"in range"` or `"starts_with"`
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let normalised = name.trim().to_lowercase().replace([' ', '-'], "_");
        Self::all_variants()
            .iter()
            .copied()
            .find(|condition| condition.name() == normalised)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::all_variants().iter().map(|c| c.name()).collect();
                ConfigError::new(format!(
                    "Unrecognised condition. Valid conditions: {}",
                    valid.join(", ")
                ))
                .with_key("condition")
                .with_value(name)
            })
    }

    /// Number of expected values this condition requires, `None` for any
    fn arity(&self) -> Option<usize> {
        match self {
            Condition::IsIn | Condition::IsNotIn => None,
            Condition::InRange | Condition::NotInRange => Some(2),
            Condition::IsNull | Condition::IsNotNull => Some(0),
            _ => Some(1),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One comparison of an item's field against expected values
#[derive(Debug, Clone)]
pub struct Comparer {
    pub condition: Condition,
    pub expected: Vec<TagValue>,
    /// Field to compare; the item's title when unset
    pub field: Option<Field>,
    pattern: Option<Regex>,
}

impl Comparer {
    pub fn new(
        condition: Condition,
        expected: Vec<TagValue>,
        field: Option<Field>,
    ) -> Result<Self, ConfigError> {
        if let Some(arity) = condition.arity() {
            // is_null style conditions ignore whatever value was configured
            if arity > 0 && expected.len() != arity {
                return Err(ConfigError::new(format!(
                    "Condition requires {} expected value(s), got {}",
                    arity,
                    expected.len()
                ))
                .with_key(condition.name()));
            }
        } else if expected.is_empty() {
            return Err(ConfigError::new("Condition requires at least one expected value")
                .with_key(condition.name()));
        }

        let pattern = match condition {
            Condition::MatchesRegEx | Condition::MatchesRegExIgnoreCase => {
                let source = expected[0].to_string();
                let regex = RegexBuilder::new(&source)
                    .case_insensitive(condition == Condition::MatchesRegExIgnoreCase)
                    .build()
                    .map_err(|e| {
                        ConfigError::new(format!("Invalid regular expression: {}", e))
                            .with_key(condition.name())
                            .with_value(&source)
                    })?;
                Some(regex)
            }
            _ => None,
        };

        Ok(Self {
            condition,
            expected,
            field,
            pattern,
        })
    }

    /// Build a comparer from a condition name and its config value(s)
    pub fn from_config(name: &str, expected: &Value, field: Option<Field>) -> Result<Self, ConfigError> {
        let condition = Condition::from_name(name)?;
        let target = field.unwrap_or(Field::Title);

        let raw: Vec<&Value> = match expected {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let mut values = Vec::with_capacity(raw.len());
        for value in raw {
            let parsed = match condition {
                // text conditions keep the literal text
                Condition::StartsWith
                | Condition::EndsWith
                | Condition::Contains
                | Condition::DoesNotContain
                | Condition::MatchesRegEx
                | Condition::MatchesRegExIgnoreCase => match value {
                    Value::String(s) => Some(TagValue::Text(s.clone())),
                    other => TagValue::from_json(Field::Title, other)?,
                },
                _ => TagValue::from_json(target, value)?,
            };
            values.extend(parsed);
        }

        Self::new(condition, values, field)
    }

    fn target(&self) -> Field {
        self.field.unwrap_or(Field::Title)
    }

    /// Evaluate this comparer against one item
    pub fn compare<T: TagItem>(&self, item: &T) -> bool {
        let value = item.get(self.target());
        self.compare_value(value.as_ref())
    }

    pub fn compare_value(&self, value: Option<&TagValue>) -> bool {
        let expected = &self.expected;
        match self.condition {
            Condition::IsNull => value.map_or(true, TagValue::is_empty),
            Condition::IsNotNull => value.is_some_and(|v| !v.is_empty()),
            Condition::Is => value == expected.first(),
            Condition::IsNot => value != expected.first(),
            Condition::IsIn => value.is_some_and(|v| expected.contains(v)),
            Condition::IsNotIn => value.map_or(true, |v| !expected.contains(v)),
            Condition::GreaterThan => value.is_some_and(|v| v > &expected[0]),
            Condition::LessThan => value.is_some_and(|v| v < &expected[0]),
            Condition::InRange => value.is_some_and(|v| &expected[0] < v && v < &expected[1]),
            Condition::NotInRange => value.map_or(true, |v| v < &expected[0] || v > &expected[1]),
            Condition::StartsWith => Self::text_matches(value, |text| {
                text.starts_with(&expected[0].to_string())
            }),
            Condition::EndsWith => {
                Self::text_matches(value, |text| text.ends_with(&expected[0].to_string()))
            }
            Condition::Contains => {
                Self::text_matches(value, |text| text.contains(&expected[0].to_string()))
            }
            Condition::DoesNotContain => {
                !Self::text_matches(value, |text| text.contains(&expected[0].to_string()))
            }
            Condition::MatchesRegEx | Condition::MatchesRegExIgnoreCase => {
                match &self.pattern {
                    Some(pattern) => Self::text_matches(value, |text| pattern.is_match(text)),
                    None => false,
                }
            }
        }
    }

    fn text_matches(value: Option<&TagValue>, check: impl Fn(&str) -> bool) -> bool {
        match value {
            None => false,
            Some(TagValue::List(items)) => items.iter().any(|item| check(item.as_str())),
            Some(other) => check(&other.to_string()),
        }
    }
}

impl fmt::Display for Comparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected: Vec<String> = self.expected.iter().map(ToString::to_string).collect();
        write!(f, "{} {} [{}]", self.target(), self.condition, expected.join(", "))
    }
}

/// Predicate over items built from named comparers
#[derive(Debug, Clone)]
pub struct ConditionFilter {
    pub comparers: Vec<Comparer>,
    pub match_all: bool,
}

impl Default for ConditionFilter {
    /// Always-match filter
    fn default() -> Self {
        Self {
            comparers: Vec::new(),
            match_all: DEFAULT_MATCH_ALL,
        }
    }
}

impl ConditionFilter {
    pub fn new(comparers: Vec<Comparer>, match_all: bool) -> Self {
        Self {
            comparers,
            match_all,
        }
    }

    /// Filter matching a single comparer
    pub fn single(comparer: Comparer) -> Self {
        Self::new(vec![comparer], DEFAULT_MATCH_ALL)
    }

    /// True when the filter has comparers to evaluate
    pub fn is_ready(&self) -> bool {
        !self.comparers.is_empty()
    }

    pub fn from_config(config: Option<&Value>) -> Result<Self, ConfigError> {
        let Some(config) = config else {
            return Ok(Self::default());
        };

        match config {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                let field = match map.get("field") {
                    Some(Value::String(name)) => Some(Field::from_name(name)?),
                    Some(Value::Null) | None => None,
                    Some(other) => {
                        return Err(ConfigError::new("Field must be a field name")
                            .with_key("field")
                            .with_value(other))
                    }
                };
                let match_all = match map.get("match_all") {
                    Some(Value::Bool(b)) => *b,
                    None => DEFAULT_MATCH_ALL,
                    Some(other) => {
                        return Err(ConfigError::new("match_all must be true or false")
                            .with_key("match_all")
                            .with_value(other))
                    }
                };

                let comparers = map
                    .iter()
                    .filter(|(key, _)| key.as_str() != "field" && key.as_str() != "match_all")
                    .map(|(key, expected)| Comparer::from_config(key, expected, field))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Self::new(comparers, match_all))
            }
            Value::Array(_) => Ok(Self::single(Comparer::from_config("is_in", config, None)?)),
            scalar => Ok(Self::single(Comparer::from_config("is", scalar, None)?)),
        }
    }

    /// Evaluate the filter against one item
    pub fn matches<T: TagItem>(&self, item: &T) -> bool {
        if self.comparers.is_empty() {
            return true;
        }

        if self.match_all {
            self.comparers.iter().all(|comparer| comparer.compare(item))
        } else {
            self.comparers.iter().any(|comparer| comparer.compare(item))
        }
    }

    /// Indices of the items matching this filter, in input order
    pub fn process<T: TagItem>(&self, items: &[T]) -> Vec<usize> {
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.matches(*item))
            .map(|(index, _)| index)
            .collect()
    }
}

impl fmt::Display for ConditionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparers.is_empty() {
            return write!(f, "always");
        }
        let joiner = if self.match_all { " AND " } else { " OR " };
        let parts: Vec<String> = self.comparers.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(joiner))
    }
}
