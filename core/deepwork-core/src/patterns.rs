//! Compiled regex patterns shared by validation and slug generation.
//!
//! Compiled once on first use.

use once_cell::sync::Lazy;
use regex::Regex;

/// Calendar day key used by the sessions document (`YYYY-MM-DD`).
pub static RE_DATE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Runs of whitespace collapsed into a single `-` when deriving activity ids.
pub static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
