//! deepwork: command-line front end for timed deep-work sessions.
//!
//! ## Subcommands
//!
//! - `check`: Verify (and optionally repair) the stored documents
//! - `start`: Run a session countdown and record it when time is up
//! - `sessions`, `totals`, `metrics`: Read recorded sessions
//! - `clear`: Delete every recorded session
//! - `settings`: Show or edit activities and duration presets

mod check;
mod commands;
mod error;
mod logging;
mod run;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use deepwork_core::{
    DeepWorkEngine, DeepWorkError, MusicChoice, SessionPlan, StorageConfig, SystemClock,
    DEFAULT_WINDOW_DAYS, ROUTE_METRICS,
};

use crate::error::CliResult;
use crate::run::{run_session, Runner, StdinSource};

#[derive(Parser)]
#[command(name = "deepwork")]
#[command(about = "Timed deep-work sessions")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to $DEEPWORK_HOME or ~/.deepwork)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify stored documents
    Check {
        /// Rewrite damaged documents keeping their well-formed entries
        #[arg(long)]
        repair: bool,
    },

    /// Start a session
    Start {
        /// Length in minutes
        #[arg(long)]
        duration: u32,

        /// Activity id (see `settings show`)
        #[arg(long)]
        activity: String,

        /// none, white-noise, lofi, or anything else
        #[arg(long)]
        music: Option<String>,
    },

    /// Print recorded sessions as JSON
    Sessions {
        /// A single day, YYYY-MM-DD
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,

        /// First day of a range, inclusive
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day of a range, inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Print total minutes per activity
    Totals,

    /// Delete every recorded session
    Clear {
        #[arg(long)]
        yes: bool,
    },

    /// Print the daily activity grid
    Metrics {
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
    },

    /// Show or edit settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print settings as JSON
    Show,

    /// Add an activity; its id is derived from the name
    AddActivity {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long)]
        color: Option<String>,
    },

    /// Remove an activity (recorded sessions keep it)
    RemoveActivity {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Change an activity's color
    Color {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(value_name = "COLOR")]
        color: String,
    },

    /// Set the three duration presets
    Durations {
        #[arg(value_name = "MINUTES", num_args = 1..)]
        minutes: Vec<u32>,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .data_dir
        .clone()
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let _logging_guard = logging::init(&storage.logs_dir());

    match execute(cli.command, storage) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "deepwork command failed");
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when the command ran but found a problem.
fn execute(command: Commands, storage: StorageConfig) -> CliResult<bool> {
    let engine = DeepWorkEngine::with_storage(storage, Arc::new(SystemClock))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Check { repair } => {
            let healthy = check::run(&engine, repair, &mut out)?;
            out.flush()?;
            return Ok(healthy);
        }
        Commands::Start {
            duration,
            activity,
            music,
        } => {
            let settings = engine.settings().get_settings();
            if settings.find_activity(&activity).is_none() {
                return Err(DeepWorkError::ActivityNotFound(activity).into());
            }
            let plan = SessionPlan {
                duration_minutes: duration,
                activity,
                music_choice: music
                    .map(MusicChoice::from)
                    .unwrap_or_else(|| engine.config().default_music.clone()),
            };

            let mut runner = Runner::new(StdinSource::new(), engine.config().poll_interval());
            let outcome = run_session(&engine, plan, &mut runner, &mut out)?;
            if outcome.route == Some(ROUTE_METRICS) {
                commands::metrics(&engine, DEFAULT_WINDOW_DAYS, &mut out)?;
            }
        }
        Commands::Sessions { date, from, to } => commands::sessions(
            &engine,
            date.as_deref(),
            from.as_deref(),
            to.as_deref(),
            &mut out,
        )?,
        Commands::Totals => commands::totals(&engine, &mut out)?,
        Commands::Clear { yes } => commands::clear(&engine, yes, &mut out)?,
        Commands::Metrics { days } => commands::metrics(&engine, days, &mut out)?,
        Commands::Settings { command } => match command {
            SettingsCommand::Show => commands::settings_show(&engine, &mut out)?,
            SettingsCommand::AddActivity { name, color } => {
                commands::add_activity(&engine, &name, color.as_deref(), &mut out)?
            }
            SettingsCommand::RemoveActivity { id } => {
                commands::remove_activity(&engine, &id, &mut out)?
            }
            SettingsCommand::Color { id, color } => {
                commands::set_color(&engine, &id, &color, &mut out)?
            }
            SettingsCommand::Durations { minutes } => {
                commands::set_durations(&engine, &minutes, &mut out)?
            }
        },
    }

    out.flush()?;
    Ok(true)
}
