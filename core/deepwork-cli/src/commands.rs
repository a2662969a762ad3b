//! Query and settings subcommands.

use std::io::Write;

use chrono::NaiveDate;
use deepwork_core::{
    Activity, DeepWorkEngine, DurationSelection, Settings, COLOR_PALETTE, DATE_KEY_FORMAT,
    DURATION_CHOICES, MAX_BOXES_PER_ROW,
};

use crate::error::{CliError, CliResult};

fn parse_date(value: &str) -> CliResult<String> {
    NaiveDate::parse_from_str(value, DATE_KEY_FORMAT)
        .map(|date| date.format(DATE_KEY_FORMAT).to_string())
        .map_err(|_| CliError::Usage(format!("invalid date (expected YYYY-MM-DD): {}", value)))
}

/// Prints stored sessions as JSON.
pub fn sessions(
    engine: &DeepWorkEngine,
    date: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let repo = engine.sessions();
    let json = match (date, from, to) {
        (Some(date), None, None) => {
            serde_json::to_string_pretty(&repo.get_sessions_by_date(&parse_date(date)?))?
        }
        (None, Some(from), Some(to)) => {
            let (from, to) = (parse_date(from)?, parse_date(to)?);
            serde_json::to_string_pretty(&repo.get_sessions_by_date_range(&from, &to))?
        }
        (None, None, None) => serde_json::to_string_pretty(&repo.get_sessions())?,
        _ => {
            return Err(CliError::Usage(
                "use either --date or both --from and --to".to_string(),
            ))
        }
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Prints total minutes per activity, largest first.
pub fn totals(engine: &DeepWorkEngine, out: &mut dyn Write) -> CliResult<()> {
    let settings = engine.settings().get_settings();
    let mut totals: Vec<_> = engine.sessions().get_totals_by_activity().into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if totals.is_empty() {
        writeln!(out, "No sessions recorded yet.")?;
    }
    for (id, minutes) in totals {
        writeln!(out, "{:<20} {:>6} min", settings.activity_label(&id), minutes)?;
    }
    Ok(())
}

pub fn clear(engine: &DeepWorkEngine, yes: bool, out: &mut dyn Write) -> CliResult<()> {
    if !yes {
        return Err(CliError::Usage(
            "this deletes every recorded session; pass --yes to confirm".to_string(),
        ));
    }
    engine.sessions().clear_sessions()?;
    writeln!(out, "All sessions cleared.")?;
    Ok(())
}

/// Prints the activity grid, one line per day that has sessions.
pub fn metrics(engine: &DeepWorkEngine, days: u32, out: &mut dyn Write) -> CliResult<()> {
    let rows = engine.daily_activity(days);
    let active: Vec<_> = rows.iter().filter(|row| !row.activities.is_empty()).collect();

    writeln!(
        out,
        "{} of the last {} days had deep work.",
        active.len(),
        rows.len()
    )?;
    for row in active {
        let boxes: String = row.activities.iter().map(|_| '■').collect();
        let overflow = if row.overflow > 0 {
            format!(" +{}", row.overflow)
        } else {
            String::new()
        };
        writeln!(
            out,
            "{}  {:<width$}{}  {} min  ({})",
            row.date.format(DATE_KEY_FORMAT),
            boxes,
            overflow,
            row.minutes,
            row.activities.join(", "),
            width = MAX_BOXES_PER_ROW
        )?;
    }
    Ok(())
}

pub fn settings_show(engine: &DeepWorkEngine, out: &mut dyn Write) -> CliResult<()> {
    let settings = engine.settings().get_settings();
    writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
    Ok(())
}

/// First palette color no activity uses yet, cycling once all are taken.
fn next_color(settings: &Settings) -> &'static str {
    COLOR_PALETTE
        .iter()
        .copied()
        .find(|color| !settings.activities.iter().any(|a| a.color == *color))
        .unwrap_or(COLOR_PALETTE[settings.activities.len() % COLOR_PALETTE.len()])
}

pub fn add_activity(
    engine: &DeepWorkEngine,
    name: &str,
    color: Option<&str>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let repo = engine.settings();
    let color = match color {
        Some(color) => color.to_string(),
        None => next_color(&repo.get_settings()).to_string(),
    };
    let Activity { id, name, color } = repo.add_activity(name, &color)?;
    writeln!(out, "Added {} ({}) {}", name, id, color)?;
    Ok(())
}

pub fn remove_activity(engine: &DeepWorkEngine, id: &str, out: &mut dyn Write) -> CliResult<()> {
    if engine.settings().delete_activity(id)? {
        writeln!(out, "Removed {}. Its past sessions are kept.", id)?;
    } else {
        writeln!(out, "No activity with id {}.", id)?;
    }
    Ok(())
}

pub fn set_color(
    engine: &DeepWorkEngine,
    id: &str,
    color: &str,
    out: &mut dyn Write,
) -> CliResult<()> {
    engine.settings().set_activity_color(id, color)?;
    writeln!(out, "{} is now {}", id, color)?;
    Ok(())
}

/// Sets the three presets, picked from the offered choices.
pub fn set_durations(
    engine: &DeepWorkEngine,
    picks: &[u32],
    out: &mut dyn Write,
) -> CliResult<()> {
    let mut selection = DurationSelection::new();
    for &minutes in picks {
        if !DURATION_CHOICES.contains(&minutes) {
            return Err(CliError::Usage(format!(
                "{} is not an offered duration (choose from {:?})",
                minutes, DURATION_CHOICES
            )));
        }
        selection.toggle(minutes);
    }
    let durations = selection.finish().ok_or_else(|| {
        CliError::Usage("pick exactly three different durations".to_string())
    })?;

    engine.settings().update_durations(durations.clone())?;
    writeln!(out, "Duration presets: {:?}", durations)?;
    Ok(())
}
