//! Startup health check for the data directory.
//!
//! ```bash
//! deepwork check            # report only
//! deepwork check --repair   # rewrite damaged documents
//! ```

use std::io::Write;

use deepwork_core::{DeepWorkEngine, DocKey};

use crate::error::CliResult;

/// Prints a report and returns whether every document is usable afterwards.
pub fn run(engine: &DeepWorkEngine, repair: bool, out: &mut dyn Write) -> CliResult<bool> {
    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out, "  DeepWork Data Check")?;
    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out, "Data directory: {}", engine.storage().root().display())?;
    writeln!(out)?;

    let report = engine.health(repair)?;
    let mut healthy = true;

    writeln!(out, "── Documents ─────────────────────────────────────────────")?;
    for entry in &report {
        let path = entry.doc.path(engine.storage());
        let exists = path.exists();
        match (&entry.repair, entry.valid) {
            (_, true) if !exists => writeln!(out, "  ✓ {:<9} (not created yet)", entry.doc.as_str())?,
            (_, true) => writeln!(out, "  ✓ {:<9} ok", entry.doc.as_str())?,
            (Some(repaired), false) => writeln!(
                out,
                "  ↻ {:<9} repaired: kept {}, discarded {}",
                entry.doc.as_str(), repaired.kept, repaired.discarded
            )?,
            (None, false) => {
                healthy = false;
                writeln!(out, "  ✗ {:<9} damaged (run with --repair)", entry.doc.as_str())?;
            }
        }
    }
    writeln!(out)?;

    writeln!(out, "── Contents ──────────────────────────────────────────────")?;
    for doc in DocKey::ALL {
        match doc {
            DocKey::Sessions => {
                let sessions = engine.sessions().get_sessions();
                writeln!(
                    out,
                    "  {} sessions across {} days",
                    sessions.session_count(),
                    sessions.days().count()
                )?;
            }
            DocKey::Settings => {
                let settings = engine.settings().get_settings();
                writeln!(
                    out,
                    "  {} activities, presets {:?}",
                    settings.activities.len(),
                    settings.durations
                )?;
            }
        }
    }
    writeln!(out)?;

    Ok(healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepwork_core::{StorageConfig, SystemClock};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_check_reports_damage_until_repaired() {
        let temp = tempdir().unwrap();
        let engine = DeepWorkEngine::with_storage(
            StorageConfig::with_root(temp.path().to_path_buf()),
            Arc::new(SystemClock),
        )
        .unwrap();
        fs_err::write(engine.storage().settings_file(), "{\"activities\": 3}").unwrap();

        let mut out = Vec::new();
        assert!(!run(&engine, false, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("damaged"));

        let mut out = Vec::new();
        assert!(run(&engine, true, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("repaired"));

        let mut out = Vec::new();
        assert!(run(&engine, false, &mut out).unwrap());
    }
}
