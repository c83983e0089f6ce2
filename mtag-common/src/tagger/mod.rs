//! Auto-tagging rule engine
//!
//! A [`Tagger`] holds an ordered list of rules. Each rule pairs a
//! [`ConditionFilter`] with setters keyed by target field:
//!
//! ```yaml
//! rules:
//!   - filter: {field: album, is: "Greatest Hits"}
//!     compilation: true
//!     track_number: {operation: incremental, sort: filename}
//!     title: {operation: template, template: "{track_number:02} {title}"}
//! ```
//!
//! Rules apply in order. Within a rule, setters run in the order they are
//! configured so later setters see values written by earlier ones.

pub mod getter;
pub mod setter;
pub mod template;

pub use getter::{getter_from_config, ConditionalGetter, Getter, LeadingZeros, PathGetter, TagGetter};
pub use setter::{setter_from_config, Aggregate, Incremental, Operation, Setter};
pub use template::Template;

use crate::error::ConfigError;
use crate::field::Field;
use crate::filter::ConditionFilter;
use crate::track::{Collection, TagItem};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Rule keys which are not target fields
const RULE_RESERVED_KEYS: &[&str] = &["filter", "field"];

/// Setters applied to the items matching a filter
#[derive(Debug, Clone, Default)]
pub struct FilteredSetter {
    pub filter: ConditionFilter,
    pub setters: Vec<Setter>,
}

impl FilteredSetter {
    pub fn new(filter: ConditionFilter, setters: Vec<Setter>) -> Self {
        Self { filter, setters }
    }

    pub fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        let filter = ConditionFilter::from_config(config.get("filter"))
            .map_err(|e| if e.key.is_none() { e.with_key("filter") } else { e })?;

        let setters = config
            .iter()
            .filter(|(key, _)| !RULE_RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| setter_from_config(Field::from_name(key)?, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { filter, setters })
    }

    /// Run every setter in order on `items[index]` with `peers` as its collection
    pub fn set_tags<T: TagItem>(&self, items: &mut [T], index: usize, peers: &[usize]) {
        for setter in &self.setters {
            setter.set(items, index, peers);
        }
    }
}

impl fmt::Display for FilteredSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "filter: {}", self.filter)?;
        for setter in &self.setters {
            writeln!(f, "  {}", setter)?;
        }
        Ok(())
    }
}

/// Applies tagging rules to a set of items
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct Tagger {
    rules: Vec<FilteredSetter>,
}

impl Tagger {
    pub fn new(rules: Vec<FilteredSetter>) -> Self {
        Self { rules }
    }

    /// Build every rule, failing on the first invalid one
    pub fn from_config(config: &[Value]) -> Result<Self, ConfigError> {
        let rules = config
            .iter()
            .enumerate()
            .map(|(position, rule)| match rule {
                Value::Object(map) => FilteredSetter::from_config(map),
                other => Err(ConfigError::new(format!(
                    "Rule {} must be a mapping of field names to setters",
                    position + 1
                ))
                .with_value(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[FilteredSetter] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to `items`
    ///
    /// Each matched item uses the first collection containing its index as
    /// its peer group, or no peers when no collection contains it. Items a
    /// rule matches are selected before any of its setters run.
    pub fn set_tags<T: TagItem>(&self, items: &mut [T], collections: &[Collection]) {
        for (position, rule) in self.rules.iter().enumerate() {
            let matched = rule.filter.process(items);
            debug!(
                rule = position + 1,
                filter = %rule.filter,
                matched = matched.len(),
                setters = rule.setters.len(),
                "Applying tag rule"
            );

            for index in matched {
                let peers = collections
                    .iter()
                    .find(|collection| collection.contains(index))
                    .map_or(&[][..], Collection::members);
                rule.set_tags(items, index, peers);
            }
        }
    }
}

impl TryFrom<Vec<Value>> for Tagger {
    type Error = ConfigError;

    fn try_from(config: Vec<Value>) -> Result<Self, Self::Error> {
        Self::from_config(&config)
    }
}

impl fmt::Display for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, rule) in self.rules.iter().enumerate() {
            write!(f, "rule {} {}", position + 1, rule)?;
        }
        Ok(())
    }
}
