//! Interactive session loop for `deepwork start`.
//!
//! Stdin is read on a background thread and delivered over a channel. The
//! loop blocks for at most one poll interval per step, so the countdown is
//! re-checked against the wall clock even while the user types nothing.
//!
//! Keys while running: `p` pause/resume, `q` end early.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use deepwork_core::{
    format_remaining, Choice, CompletionMachine, CompletionState, DeepWorkEngine,
    PendingDecision, SessionPlan,
};
use tracing::debug;

use crate::error::CliResult;

/// What the loop consumes on each step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Tick,
}

/// Source of input lines.
pub trait LineSource {
    /// Blocks for up to `timeout` waiting for a line.
    fn recv_timeout(&self, timeout: Duration) -> Result<String, RecvTimeoutError>;
}

/// Production source reading stdin line by line.
pub struct StdinSource {
    rx: Receiver<String>,
}

impl StdinSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Self { rx }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for StdinSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the loop one line or tick at a time.
pub struct Runner<S: LineSource> {
    source: S,
    interval: Duration,
    closed: bool,
}

impl<S: LineSource> Runner<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            closed: false,
        }
    }

    /// Blocks up to one interval and returns the next line, or Tick on timeout.
    pub fn step(&mut self) -> InputEvent {
        match self.source.recv_timeout(self.interval) {
            Ok(line) => InputEvent::Line(line),
            Err(RecvTimeoutError::Timeout) => InputEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                if !self.closed {
                    debug!("Input closed; answering prompts with defaults");
                }
                self.closed = true;
                std::thread::sleep(self.interval);
                InputEvent::Tick
            }
        }
    }

    /// True once the input has ended.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub state: CompletionState,
    /// Where the user asked to go next, if anywhere.
    pub route: Option<&'static str>,
}

/// Runs one session to a terminal state.
pub fn run_session<S: LineSource>(
    engine: &DeepWorkEngine,
    plan: SessionPlan,
    runner: &mut Runner<S>,
    out: &mut dyn Write,
) -> CliResult<SessionOutcome> {
    let mut machine = engine.start_session(plan)?;
    writeln!(
        out,
        "Started {} for {} min. [p] pause/resume, [q] end early",
        engine
            .settings()
            .get_settings()
            .activity_label(&machine.plan().activity),
        machine.plan().duration_minutes
    )?;

    loop {
        if machine.state() == CompletionState::Saving {
            machine.save(engine.sessions())?;
            prompt(&machine, out)?;
            continue;
        }
        if machine.state().is_terminal() && machine.pending().is_none() {
            return Ok(SessionOutcome {
                state: machine.state(),
                route: None,
            });
        }

        let route = match runner.step() {
            InputEvent::Line(line) => handle_line(&mut machine, &line, out)?,
            InputEvent::Tick => {
                if machine.poll() {
                    prompt(&machine, out)?;
                } else if machine.state() == CompletionState::Running {
                    write!(out, "\r{} ", format_remaining(machine.remaining()))?;
                    out.flush()?;
                }
                if runner.is_closed() {
                    answer_with_defaults(&mut machine, out)?
                } else {
                    None
                }
            }
        };

        if let Some(route) = route {
            return Ok(SessionOutcome {
                state: machine.state(),
                route: Some(route),
            });
        }
    }
}

fn prompt(machine: &CompletionMachine, out: &mut dyn Write) -> CliResult<()> {
    match machine.pending() {
        Some(PendingDecision::ConfirmEnd) => {
            writeln!(out, "\nEnd this session without saving? [y/N]")?
        }
        Some(PendingDecision::SaveFailed {
            attempts,
            error,
            retry_allowed: true,
        }) => writeln!(
            out,
            "\nCould not save (attempt {}): {}\n[r]etry or [c]ancel?",
            attempts, error
        )?,
        Some(PendingDecision::SaveFailed {
            error,
            retry_allowed: false,
            ..
        }) => writeln!(
            out,
            "\nCould not save: {}\n[a]bandon or [c]ontinue without saving?",
            error
        )?,
        Some(PendingDecision::Finished) => writeln!(
            out,
            "\nSession saved. [m] view progress or [n] new session?"
        )?,
        None => match machine.state() {
            CompletionState::AwaitingNotes => {
                writeln!(out, "\nTime's up! Notes (optional, Enter to skip):")?
            }
            CompletionState::Paused => writeln!(out, "\nPaused. [p] to resume")?,
            CompletionState::Abandoned => writeln!(out, "\nSession ended.")?,
            _ => {}
        },
    }
    Ok(())
}

fn handle_line(
    machine: &mut CompletionMachine,
    line: &str,
    out: &mut dyn Write,
) -> CliResult<Option<&'static str>> {
    let answer = line.trim().to_lowercase();

    if let Some(pending) = machine.pending().cloned() {
        let choice = match (&pending, answer.as_str()) {
            (PendingDecision::ConfirmEnd, "y" | "yes") => Choice::EndSession,
            (PendingDecision::ConfirmEnd, _) => Choice::KeepGoing,
            (PendingDecision::SaveFailed { retry_allowed: true, .. }, "r" | "retry") => {
                Choice::Retry
            }
            (PendingDecision::SaveFailed { retry_allowed: true, .. }, "c" | "cancel") => {
                Choice::Cancel
            }
            (PendingDecision::SaveFailed { retry_allowed: false, .. }, "a" | "abandon") => {
                Choice::Abandon
            }
            (PendingDecision::SaveFailed { retry_allowed: false, .. }, "c" | "continue") => {
                Choice::Continue
            }
            (PendingDecision::Finished, "m" | "metrics") => Choice::ViewProgress,
            (PendingDecision::Finished, "n" | "new" | "") => Choice::NewSession,
            _ => {
                prompt(machine, out)?;
                return Ok(None);
            }
        };
        let route = machine.resolve(choice)?;
        prompt(machine, out)?;
        return Ok(route);
    }

    match (machine.state(), answer.as_str()) {
        (CompletionState::AwaitingNotes, _) => machine.submit_notes(line.trim())?,
        (CompletionState::Running | CompletionState::Paused, "p") => {
            machine.toggle_pause()?;
            prompt(machine, out)?;
        }
        (CompletionState::Running | CompletionState::Paused, "q") => {
            machine.request_end()?;
            prompt(machine, out)?;
        }
        _ => {}
    }
    Ok(None)
}

/// Without input, notes are skipped and every question gets its safe answer.
fn answer_with_defaults(
    machine: &mut CompletionMachine,
    out: &mut dyn Write,
) -> CliResult<Option<&'static str>> {
    if machine.state() == CompletionState::AwaitingNotes {
        machine.submit_notes("")?;
        return Ok(None);
    }
    let choice = match machine.pending() {
        None => return Ok(None),
        Some(PendingDecision::ConfirmEnd) => Choice::KeepGoing,
        Some(PendingDecision::SaveFailed {
            retry_allowed: true,
            ..
        }) => Choice::Retry,
        Some(PendingDecision::SaveFailed { .. }) => Choice::Abandon,
        Some(PendingDecision::Finished) => Choice::NewSession,
    };
    let route = machine.resolve(choice)?;
    prompt(machine, out)?;
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use deepwork_core::{ManualClock, MusicChoice, StorageConfig, ROUTE_HOME, ROUTE_METRICS};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    enum Step {
        Wait,
        Line(&'static str),
    }

    /// Scripted input; every timeout moves the clock forward 30 seconds.
    struct ScriptedSource {
        clock: Arc<ManualClock>,
        steps: RefCell<VecDeque<Step>>,
    }

    impl LineSource for ScriptedSource {
        fn recv_timeout(&self, _timeout: Duration) -> Result<String, RecvTimeoutError> {
            match self.steps.borrow_mut().pop_front() {
                Some(Step::Line(line)) => Ok(line.to_string()),
                Some(Step::Wait) => {
                    self.clock.advance(chrono::Duration::seconds(30));
                    Err(RecvTimeoutError::Timeout)
                }
                None => {
                    self.clock.advance(chrono::Duration::seconds(30));
                    Err(RecvTimeoutError::Disconnected)
                }
            }
        }
    }

    fn setup(steps: Vec<Step>) -> (TempDir, DeepWorkEngine, Runner<ScriptedSource>) {
        let temp = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap(),
        ));
        let engine = DeepWorkEngine::with_storage(
            StorageConfig::with_root(temp.path().to_path_buf()),
            clock.clone(),
        )
        .unwrap();
        let source = ScriptedSource {
            clock,
            steps: RefCell::new(steps.into()),
        };
        (temp, engine, Runner::new(source, Duration::from_millis(1)))
    }

    fn plan() -> SessionPlan {
        SessionPlan {
            duration_minutes: 1,
            activity: "code".to_string(),
            music_choice: MusicChoice::WhiteNoise,
        }
    }

    #[test]
    fn test_full_session_saves_notes_and_routes_to_metrics() {
        let (_temp, engine, mut runner) = setup(vec![
            Step::Wait,
            Step::Wait,
            Step::Line("felt sharp"),
            Step::Line("m"),
        ]);
        let mut out = Vec::new();

        let outcome = run_session(&engine, plan(), &mut runner, &mut out).unwrap();
        assert_eq!(outcome.state, CompletionState::Completed);
        assert_eq!(outcome.route, Some(ROUTE_METRICS));

        let saved = engine.sessions().get_sessions_by_date("2024-02-15");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].notes, "felt sharp");
        assert!(String::from_utf8(out).unwrap().contains("Time's up!"));
    }

    #[test]
    fn test_pause_then_quit_saves_nothing() {
        let (_temp, engine, mut runner) = setup(vec![
            Step::Line("p"),
            Step::Wait,
            Step::Wait,
            Step::Wait,
            Step::Wait,
            Step::Line("q"),
            Step::Line("y"),
        ]);
        let mut out = Vec::new();

        let outcome = run_session(&engine, plan(), &mut runner, &mut out).unwrap();
        assert_eq!(outcome.state, CompletionState::Abandoned);
        assert_eq!(outcome.route, None);
        assert!(engine.sessions().get_sessions().is_empty());
    }

    #[test]
    fn test_closed_input_skips_notes_and_finishes() {
        let (_temp, engine, mut runner) = setup(Vec::new());
        let mut out = Vec::new();

        let outcome = run_session(&engine, plan(), &mut runner, &mut out).unwrap();
        assert!(runner.is_closed());
        assert_eq!(outcome.route, Some(ROUTE_HOME));
        assert_eq!(engine.sessions().get_sessions().session_count(), 1);
    }
}
