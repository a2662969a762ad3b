//! Core data model shared by the store, the repositories and clients.
//!
//! Field names on the wire are camelCase so documents written by earlier
//! clients keep loading unchanged.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{DeepWorkError, Result};
use crate::patterns::RE_WHITESPACE_RUN;

// ═══════════════════════════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of duration presets offered on the session-setup screen.
pub const DURATION_PRESET_COUNT: usize = 3;

/// Presets used until the user saves their own.
pub const DEFAULT_DURATIONS: [u32; DURATION_PRESET_COUNT] = [10, 20, 30];

/// Lengths (minutes) the settings screen lets the user pick presets from.
pub const DURATION_CHOICES: [u32; 6] = [5, 10, 15, 20, 30, 45];

/// Colors offered when creating an activity.
pub const COLOR_PALETTE: [&str; 8] = [
    "#c8b2d6", "#f1dbbc", "#bcd2f1", "#d6b2c8", "#b2d6c8", "#dbbcf1", "#bcf1db", "#f1bcdb",
];

/// Display color for sessions whose activity no longer exists.
pub const FALLBACK_COLOR: &str = "#9ca3af";

pub const MAX_ACTIVITY_NAME_CHARS: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════════════

/// Background audio chosen for a session.
///
/// Values outside the built-in set are kept verbatim; the store never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MusicChoice {
    None,
    WhiteNoise,
    Lofi,
    Other(String),
}

impl MusicChoice {
    pub fn as_str(&self) -> &str {
        match self {
            MusicChoice::None => "none",
            MusicChoice::WhiteNoise => "white-noise",
            MusicChoice::Lofi => "lofi",
            MusicChoice::Other(value) => value,
        }
    }
}

impl Default for MusicChoice {
    fn default() -> Self {
        MusicChoice::None
    }
}

impl From<String> for MusicChoice {
    fn from(value: String) -> Self {
        match value.as_str() {
            "none" => MusicChoice::None,
            "white-noise" => MusicChoice::WhiteNoise,
            "lofi" => MusicChoice::Lofi,
            _ => MusicChoice::Other(value),
        }
    }
}

impl From<&str> for MusicChoice {
    fn from(value: &str) -> Self {
        MusicChoice::from(value.to_string())
    }
}

impl From<MusicChoice> for String {
    fn from(choice: MusicChoice) -> String {
        match choice {
            MusicChoice::Other(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MusicChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed deep-work interval. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Calendar day of `completed_at`, `YYYY-MM-DD`.
    pub date: String,
    /// Activity id at save time. Not kept in sync with the activities list.
    pub activity: String,
    /// Configured session length in minutes, not the measured elapsed time.
    pub duration: u32,
    pub music_choice: MusicChoice,
    #[serde(default)]
    pub notes: String,
    pub completed_at: DateTime<FixedOffset>,
}

/// Caller-supplied part of a session; the repository stamps the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInput {
    pub activity: String,
    pub duration: u32,
    pub music_choice: MusicChoice,
    pub notes: String,
}

/// Completed sessions keyed by day. Within a day, entries stay in save order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionsDocument(BTreeMap<String, Vec<Session>>);

impl SessionsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the list for the session's own date.
    pub fn push(&mut self, session: Session) {
        self.0.entry(session.date.clone()).or_default().push(session);
    }

    pub fn day(&self, date: &str) -> &[Session] {
        self.0.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates days in ascending date order.
    pub fn days(&self) -> impl Iterator<Item = (&str, &[Session])> {
        self.0.iter().map(|(date, list)| (date.as_str(), list.as_slice()))
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.0.values().flatten()
    }

    pub fn session_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert_day(&mut self, date: String, sessions: Vec<Session>) {
        self.0.insert(date, sessions);
    }

    pub(crate) fn retain_days<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.0.retain(|date, _| keep(date));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════════════════

/// A user-defined focus category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Activity {
    /// Builds an activity whose id is derived from the name.
    pub fn new(name: &str, color: &str) -> Result<Self> {
        let name = name.trim();
        validate_activity_name(name)?;
        Ok(Self {
            id: slugify(name),
            name: name.to_string(),
            color: color.to_string(),
        })
    }
}

/// Derives an activity id: lower-cased, whitespace runs replaced by `-`.
pub fn slugify(name: &str) -> String {
    RE_WHITESPACE_RUN
        .replace_all(&name.trim().to_lowercase(), "-")
        .into_owned()
}

fn validate_activity_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DeepWorkError::Validation(
            "activity name must not be empty".to_string(),
        ));
    }
    let chars = name.chars().count();
    if chars > MAX_ACTIVITY_NAME_CHARS {
        return Err(DeepWorkError::Validation(format!(
            "activity name is {} characters, limit is {}",
            chars, MAX_ACTIVITY_NAME_CHARS
        )));
    }
    Ok(())
}

/// Checks ids are unique and non-empty and names fit the display limit.
pub fn validate_activities(activities: &[Activity]) -> Result<()> {
    let mut seen = HashSet::new();
    for activity in activities {
        if activity.id.trim().is_empty() {
            return Err(DeepWorkError::Validation(
                "activity id must not be empty".to_string(),
            ));
        }
        validate_activity_name(&activity.name)?;
        if !seen.insert(activity.id.as_str()) {
            return Err(DeepWorkError::Validation(format!(
                "duplicate activity id: {}",
                activity.id
            )));
        }
    }
    Ok(())
}

/// A preset set must be exactly three unique positive values.
pub fn validate_durations(durations: &[u32]) -> Result<()> {
    if durations.len() != DURATION_PRESET_COUNT {
        return Err(DeepWorkError::Validation(format!(
            "expected {} duration presets, got {}",
            DURATION_PRESET_COUNT,
            durations.len()
        )));
    }
    if durations.iter().any(|&d| d == 0) {
        return Err(DeepWorkError::Validation(
            "duration presets must be positive".to_string(),
        ));
    }
    let unique: HashSet<_> = durations.iter().collect();
    if unique.len() != durations.len() {
        return Err(DeepWorkError::Validation(
            "duration presets must be unique".to_string(),
        ));
    }
    Ok(())
}

/// The settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub activities: Vec<Activity>,
    pub durations: Vec<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            activities: default_activities(),
            durations: DEFAULT_DURATIONS.to_vec(),
        }
    }
}

pub fn default_activities() -> Vec<Activity> {
    [
        ("write", "Write", "#c8b2d6"),
        ("code", "Code", "#f1dbbc"),
        ("produce-music", "Produce Music", "#bcd2f1"),
    ]
    .into_iter()
    .map(|(id, name, color)| Activity {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        validate_activities(&self.activities)?;
        validate_durations(&self.durations)
    }

    pub fn find_activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    /// Color for an activity id, falling back for ids that were deleted.
    pub fn activity_color(&self, id: &str) -> &str {
        self.find_activity(id)
            .map(|a| a.color.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    /// Display label for an activity id; deleted ids are title-cased from the slug.
    pub fn activity_label(&self, id: &str) -> String {
        match self.find_activity(id) {
            Some(activity) => activity.name.clone(),
            None => crate::metrics::format_activity_name(id),
        }
    }
}
