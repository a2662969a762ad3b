//! Aggregations behind the progress view.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::sessions::DATE_KEY_FORMAT;
use crate::types::SessionsDocument;

/// Sessions drawn per day before the row is considered full.
pub const MAX_BOXES_PER_ROW: usize = 10;

/// Default trailing window for the activity grid.
pub const DEFAULT_WINDOW_DAYS: u32 = 366;

/// Longest window `daily_activity` will walk; larger requests are capped.
pub const MAX_WINDOW_DAYS: u32 = 3_660;

/// One row of the activity grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    /// Activity ids in save order, at most `MAX_BOXES_PER_ROW`.
    pub activities: Vec<String>,
    /// Sessions beyond the row limit.
    pub overflow: usize,
    pub minutes: u64,
}

/// One row per day for the `days` days ending at `today`, oldest first.
///
/// `days` is capped at `MAX_WINDOW_DAYS`, and days before the earliest
/// representable date are skipped.
pub fn daily_activity(doc: &SessionsDocument, today: NaiveDate, days: u32) -> Vec<DayActivity> {
    (0..u64::from(days.min(MAX_WINDOW_DAYS)))
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| {
            let key = date.format(DATE_KEY_FORMAT).to_string();
            let sessions = doc.day(&key);
            DayActivity {
                date,
                activities: sessions
                    .iter()
                    .take(MAX_BOXES_PER_ROW)
                    .map(|s| s.activity.clone())
                    .collect(),
                overflow: sessions.len().saturating_sub(MAX_BOXES_PER_ROW),
                minutes: sessions.iter().map(|s| u64::from(s.duration)).sum(),
            }
        })
        .collect()
}

/// "produce-music" -> "Produce Music"
pub fn format_activity_name(id: &str) -> String {
    id.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MusicChoice, Session};
    use chrono::DateTime;

    fn session(date: &str, activity: &str, duration: u32) -> Session {
        Session {
            date: date.to_string(),
            activity: activity.to_string(),
            duration,
            music_choice: MusicChoice::None,
            notes: String::new(),
            completed_at: DateTime::parse_from_rfc3339(&format!("{}T12:00:00+00:00", date))
                .unwrap(),
        }
    }

    #[test]
    fn test_format_activity_name() {
        assert_eq!(format_activity_name("produce-music"), "Produce Music");
        assert_eq!(format_activity_name("code"), "Code");
    }

    #[test]
    fn test_daily_activity_window() {
        let mut doc = SessionsDocument::new();
        doc.push(session("2024-02-13", "write", 30));
        doc.push(session("2024-02-13", "write", 20));
        doc.push(session("2024-02-15", "code", 30));
        doc.push(session("2024-01-01", "code", 30));

        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let rows = daily_activity(&doc, today, 3);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 2, 13).unwrap());
        assert_eq!(rows[0].activities, vec!["write", "write"]);
        assert_eq!(rows[0].minutes, 50);
        assert!(rows[1].activities.is_empty());
        assert_eq!(rows[2].activities, vec!["code"]);
    }

    #[test]
    fn test_daily_activity_caps_row() {
        let mut doc = SessionsDocument::new();
        for _ in 0..12 {
            doc.push(session("2024-02-15", "code", 5));
        }
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let rows = daily_activity(&doc, today, 1);

        assert_eq!(rows[0].activities.len(), MAX_BOXES_PER_ROW);
        assert_eq!(rows[0].overflow, 2);
        assert_eq!(rows[0].minutes, 60);
    }

    #[test]
    fn test_daily_activity_caps_huge_window() {
        let mut doc = SessionsDocument::new();
        doc.push(session("2024-02-15", "code", 25));
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();

        let rows = daily_activity(&doc, today, u32::MAX);
        assert_eq!(rows.len(), MAX_WINDOW_DAYS as usize);
        assert_eq!(rows.last().unwrap().date, today);
        assert_eq!(rows.last().unwrap().minutes, 25);
    }

    #[test]
    fn test_daily_activity_stops_at_earliest_date() {
        let doc = SessionsDocument::new();
        let today = NaiveDate::MIN.checked_add_days(Days::new(4)).unwrap();

        let rows = daily_activity(&doc, today, 30);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date, NaiveDate::MIN);
        assert_eq!(rows[4].date, today);
    }
}
