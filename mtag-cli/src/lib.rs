//! # mtag
//!
//! Rule-based auto-tagging for a local music library:
//! - Library scanning and tag I/O through lofty
//! - The tag, check, fields, backup and restore commands

pub mod commands;
pub mod error;
pub mod library;

pub use error::{Error, Result, ScanError};
pub use library::{LocalLibrary, SaveResult};
