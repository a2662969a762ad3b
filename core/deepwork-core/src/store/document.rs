//! Document shapes known to the store.
//!
//! Each document knows how to check its raw JSON structurally and how to
//! salvage the well-formed part of a damaged copy. Both work on
//! `serde_json::Value` so a single bad entry never hides the rest.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::patterns::RE_DATE_KEY;
use crate::storage::StorageConfig;
use crate::types::{
    default_activities, validate_activities, validate_durations, Activity, Session,
    SessionsDocument, Settings, DEFAULT_DURATIONS, DURATION_PRESET_COUNT,
    MAX_ACTIVITY_NAME_CHARS,
};

/// Names of the documents the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKey {
    Sessions,
    Settings,
}

impl DocKey {
    pub const ALL: [DocKey; 2] = [DocKey::Sessions, DocKey::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKey::Sessions => "sessions",
            DocKey::Settings => "settings",
        }
    }

    pub fn path(&self, storage: &StorageConfig) -> std::path::PathBuf {
        match self {
            DocKey::Sessions => storage.sessions_file(),
            DocKey::Settings => storage.settings_file(),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON document stored under a fixed key.
pub trait Document: Serialize + DeserializeOwned + Default + Sized {
    const KEY: DocKey;

    /// Read-only structural validation. `Err` describes the first problem found.
    fn check(value: &Value) -> Result<(), String>;

    /// Keeps every well-formed entry. Returns the document and the number of
    /// entries dropped.
    fn salvage(value: Value) -> (Self, usize);

    /// Number of entries, used for repair reporting.
    fn entry_count(&self) -> usize;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

fn is_date_key(key: &str) -> bool {
    RE_DATE_KEY.is_match(key) && NaiveDate::parse_from_str(key, "%Y-%m-%d").is_ok()
}

fn parse_session(date: &str, value: &Value) -> Result<Session, String> {
    let session: Session =
        serde_json::from_value(value.clone()).map_err(|e| format!("malformed session: {}", e))?;
    if session.duration == 0 {
        return Err("session duration must be positive".to_string());
    }
    if session.date != date {
        return Err(format!(
            "session dated {} stored under {}",
            session.date, date
        ));
    }
    Ok(session)
}

impl Document for SessionsDocument {
    const KEY: DocKey = DocKey::Sessions;

    fn check(value: &Value) -> Result<(), String> {
        let days = value
            .as_object()
            .ok_or_else(|| "sessions document is not an object".to_string())?;

        for (date, entries) in days {
            if !is_date_key(date) {
                return Err(format!("invalid date key: {}", date));
            }
            let entries = entries
                .as_array()
                .ok_or_else(|| format!("entries for {} are not a list", date))?;
            for (index, entry) in entries.iter().enumerate() {
                parse_session(date, entry).map_err(|e| format!("{}[{}]: {}", date, index, e))?;
            }
        }
        Ok(())
    }

    fn salvage(value: Value) -> (Self, usize) {
        let days = match value {
            Value::Object(days) => days,
            _ => return (SessionsDocument::default(), 1),
        };

        let mut doc = SessionsDocument::default();
        let mut discarded = 0;

        for (date, entries) in days {
            let entries = match entries {
                Value::Array(entries) if is_date_key(&date) => entries,
                Value::Array(entries) => {
                    discarded += entries.len().max(1);
                    continue;
                }
                _ => {
                    discarded += 1;
                    continue;
                }
            };

            let mut kept = Vec::with_capacity(entries.len());
            for entry in &entries {
                match parse_session(&date, entry) {
                    Ok(session) => kept.push(session),
                    Err(_) => discarded += 1,
                }
            }
            if !kept.is_empty() {
                doc.insert_day(date, kept);
            }
        }

        (doc, discarded)
    }

    fn entry_count(&self) -> usize {
        self.session_count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

impl Document for Settings {
    const KEY: DocKey = DocKey::Settings;

    fn check(value: &Value) -> Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| "settings document is not an object".to_string())?;

        let activities: Vec<Activity> = object
            .get("activities")
            .cloned()
            .ok_or_else(|| "missing activities".to_string())
            .and_then(|v| serde_json::from_value(v).map_err(|e| format!("activities: {}", e)))?;
        validate_activities(&activities).map_err(|e| e.to_string())?;

        let durations: Vec<u32> = object
            .get("durations")
            .cloned()
            .ok_or_else(|| "missing durations".to_string())
            .and_then(|v| serde_json::from_value(v).map_err(|e| format!("durations: {}", e)))?;
        validate_durations(&durations).map_err(|e| e.to_string())
    }

    fn salvage(value: Value) -> (Self, usize) {
        let mut object = match value {
            Value::Object(object) => object,
            _ => return (Settings::default(), 1),
        };
        let mut discarded = 0;

        let activities = match object.remove("activities") {
            Some(Value::Array(entries)) => {
                let mut seen = HashSet::new();
                let mut kept = Vec::with_capacity(entries.len());
                for entry in entries {
                    match serde_json::from_value::<Activity>(entry) {
                        Ok(activity)
                            if !activity.id.trim().is_empty()
                                && !activity.name.trim().is_empty()
                                && activity.name.chars().count() <= MAX_ACTIVITY_NAME_CHARS
                                && seen.insert(activity.id.clone()) =>
                        {
                            kept.push(activity)
                        }
                        _ => discarded += 1,
                    }
                }
                kept
            }
            _ => {
                discarded += 1;
                default_activities()
            }
        };

        let durations = match object.remove("durations") {
            Some(Value::Array(entries)) => {
                let total = entries.len();
                let mut kept: Vec<u32> = Vec::with_capacity(DURATION_PRESET_COUNT);
                for entry in entries {
                    match serde_json::from_value::<u32>(entry) {
                        Ok(minutes) if minutes > 0 && !kept.contains(&minutes) => {
                            kept.push(minutes)
                        }
                        _ => {}
                    }
                }
                if kept.len() == DURATION_PRESET_COUNT {
                    discarded += total - kept.len();
                    kept
                } else {
                    discarded += total.max(1);
                    DEFAULT_DURATIONS.to_vec()
                }
            }
            _ => {
                discarded += 1;
                DEFAULT_DURATIONS.to_vec()
            }
        };

        (
            Settings {
                activities,
                durations,
            },
            discarded,
        )
    }

    fn entry_count(&self) -> usize {
        self.activities.len() + self.durations.len()
    }
}
