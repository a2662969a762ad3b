//! Completed-session records.
//!
//! The repository is the only writer of the sessions document. Every save
//! stamps the record from the injected clock, checks the stored document's
//! integrity, and rewrites the document once. It never repairs.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::error::{DeepWorkError, Result};
use crate::store::{DocKey, DocumentStore};
use crate::types::{Session, SessionInput, SessionsDocument};

/// Date key format; lexicographic order equals chronological order.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Destination for finished sessions, as seen by the completion flow.
pub trait SessionSink {
    fn add_session(&self, input: SessionInput) -> Result<Session>;
}

pub struct SessionRepository {
    store: Arc<DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl SessionRepository {
    pub fn new(store: Arc<DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends a session to today's list.
    ///
    /// Fails with `Integrity` when the stored document is damaged and with
    /// `Write` when the new document cannot be persisted.
    pub fn add_session(&self, input: SessionInput) -> Result<Session> {
        if input.duration == 0 {
            return Err(DeepWorkError::Validation(
                "session duration must be positive".to_string(),
            ));
        }
        if input.activity.trim().is_empty() {
            return Err(DeepWorkError::Validation(
                "session activity must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let session = Session {
            date: now.format(DATE_KEY_FORMAT).to_string(),
            activity: input.activity,
            duration: input.duration,
            music_choice: input.music_choice,
            notes: input.notes,
            completed_at: now.fixed_offset(),
        };

        self.store.mutate::<SessionsDocument, _, _>(|doc| {
            doc.push(session.clone());
            Ok(())
        })?;

        info!(
            date = %session.date,
            activity = %session.activity,
            duration = session.duration,
            "Session recorded"
        );
        Ok(session)
    }

    pub fn get_sessions(&self) -> SessionsDocument {
        self.store.read()
    }

    pub fn get_sessions_by_date(&self, date: &str) -> Vec<Session> {
        self.get_sessions().day(date).to_vec()
    }

    /// Days between `start` and `end`, both inclusive.
    pub fn get_sessions_by_date_range(&self, start: &str, end: &str) -> SessionsDocument {
        let mut doc = self.get_sessions();
        doc.retain_days(|date| date >= start && date <= end);
        doc
    }

    /// Total configured minutes per activity id across all stored sessions.
    pub fn get_totals_by_activity(&self) -> BTreeMap<String, u64> {
        totals_by_activity(&self.get_sessions())
    }

    /// Deletes every stored session.
    pub fn clear_sessions(&self) -> Result<()> {
        self.store.remove(DocKey::Sessions)
    }
}

impl SessionSink for SessionRepository {
    fn add_session(&self, input: SessionInput) -> Result<Session> {
        SessionRepository::add_session(self, input)
    }
}

pub fn totals_by_activity(doc: &SessionsDocument) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for session in doc.sessions() {
        *totals.entry(session.activity.clone()).or_insert(0) += u64::from(session.duration);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::StorageConfig;
    use crate::types::MusicChoice;
    use chrono::{Duration, Local, TimeZone};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<ManualClock>, SessionRepository) {
        let temp = tempdir().unwrap();
        let store = Arc::new(DocumentStore::new(StorageConfig::with_root(
            temp.path().to_path_buf(),
        )));
        store.initialize().unwrap();
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 2, 15, 9, 30, 0).unwrap(),
        ));
        let repo = SessionRepository::new(store, clock.clone());
        (temp, clock, repo)
    }

    fn input(activity: &str, duration: u32) -> SessionInput {
        SessionInput {
            activity: activity.to_string(),
            duration,
            music_choice: MusicChoice::None,
            notes: String::new(),
        }
    }

    #[test]
    fn test_add_session_stamps_date_from_clock() {
        let (_temp, _clock, repo) = setup();
        let session = repo.add_session(input("code", 20)).unwrap();

        assert_eq!(session.date, "2024-02-15");
        assert_eq!(
            session.completed_at.format(DATE_KEY_FORMAT).to_string(),
            session.date
        );
        assert_eq!(repo.get_sessions_by_date("2024-02-15"), vec![session]);
    }

    #[test]
    fn test_add_session_rejects_zero_duration() {
        let (_temp, _clock, repo) = setup();
        let err = repo.add_session(input("code", 0)).unwrap_err();
        assert!(matches!(err, DeepWorkError::Validation(_)));
        assert!(repo.get_sessions().is_empty());
    }

    #[test]
    fn test_sessions_keep_call_order_within_a_day() {
        let (_temp, clock, repo) = setup();
        for (i, activity) in ["write", "code", "write", "code"].iter().enumerate() {
            clock.advance(Duration::minutes(i as i64));
            repo.add_session(input(activity, 10)).unwrap();
        }

        let day = repo.get_sessions_by_date("2024-02-15");
        let activities: Vec<_> = day.iter().map(|s| s.activity.as_str()).collect();
        assert_eq!(activities, vec!["write", "code", "write", "code"]);
    }

    #[test]
    fn test_unknown_date_is_empty() {
        let (_temp, _clock, repo) = setup();
        assert!(repo.get_sessions_by_date("1999-01-01").is_empty());
    }

    #[test]
    fn test_totals_by_activity() {
        let (_temp, _clock, repo) = setup();
        repo.add_session(input("code", 10)).unwrap();
        repo.add_session(input("code", 20)).unwrap();
        repo.add_session(input("write", 5)).unwrap();

        let totals = repo.get_totals_by_activity();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["code"], 30);
        assert_eq!(totals["write"], 5);
    }

    #[test]
    fn test_clear_sessions() {
        let (_temp, _clock, repo) = setup();
        repo.add_session(input("code", 10)).unwrap();
        repo.clear_sessions().unwrap();
        assert!(repo.get_sessions().is_empty());
        assert!(repo.get_totals_by_activity().is_empty());
    }
}
