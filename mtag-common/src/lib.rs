//! # mtag common library
//!
//! Shared code for the mtag tools including:
//! - Track fields, tag values and the item/collection model
//! - Condition filters
//! - The auto-tagging rule engine (getters, setters, tagger)
//! - Configuration loading and logging setup

pub mod config;
pub mod error;
pub mod field;
pub mod filter;
pub mod logging;
pub mod tagger;
pub mod track;
pub mod value;

pub use config::AppConfig;
pub use error::{ConfigError, Error, Result};
pub use field::{Field, FieldKind};
pub use filter::{Comparer, Condition, ConditionFilter};
pub use tagger::Tagger;
pub use track::{Collection, TagItem, Track};
pub use value::TagValue;
