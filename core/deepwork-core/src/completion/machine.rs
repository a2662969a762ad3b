//! State machine that carries a finished countdown through notes and saving.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use tracing::{info, warn};

use super::countdown::Countdown;
use crate::clock::Clock;
use crate::error::{DeepWorkError, Result};
use crate::sessions::SessionSink;
use crate::types::{MusicChoice, Session, SessionInput};

/// Save attempts allowed before only abandon/continue are offered.
pub const SAVE_RETRY_BUDGET: u32 = 3;

/// Navigation token for the progress view.
pub const ROUTE_METRICS: &str = "metrics";
/// Navigation token for the session-setup view.
pub const ROUTE_HOME: &str = "home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionState {
    Running,
    Paused,
    AwaitingNotes,
    Saving,
    Completed,
    Failed,
    Abandoned,
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionState::Running => "running",
            CompletionState::Paused => "paused",
            CompletionState::AwaitingNotes => "awaiting notes",
            CompletionState::Saving => "saving",
            CompletionState::Completed => "completed",
            CompletionState::Failed => "failed",
            CompletionState::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionState::Completed | CompletionState::Abandoned)
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters chosen on the setup screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub duration_minutes: u32,
    pub activity: String,
    pub music_choice: MusicChoice,
}

/// Answers the caller can give to a pending decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    EndSession,
    KeepGoing,
    Retry,
    Cancel,
    Abandon,
    Continue,
    ViewProgress,
    NewSession,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::EndSession => "end session",
            Choice::KeepGoing => "keep going",
            Choice::Retry => "retry",
            Choice::Cancel => "cancel",
            Choice::Abandon => "abandon",
            Choice::Continue => "continue without saving",
            Choice::ViewProgress => "view progress",
            Choice::NewSession => "new session",
        }
    }
}

/// A question the machine is waiting on the caller to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDecision {
    /// The user asked to end early.
    ConfirmEnd,
    /// The last save attempt failed.
    SaveFailed {
        attempts: u32,
        error: String,
        retry_allowed: bool,
    },
    /// The session was saved.
    Finished,
}

impl PendingDecision {
    pub fn choices(&self) -> &'static [Choice] {
        match self {
            PendingDecision::ConfirmEnd => &[Choice::EndSession, Choice::KeepGoing],
            PendingDecision::SaveFailed {
                retry_allowed: true,
                ..
            } => &[Choice::Retry, Choice::Cancel],
            PendingDecision::SaveFailed {
                retry_allowed: false,
                ..
            } => &[Choice::Abandon, Choice::Continue],
            PendingDecision::Finished => &[Choice::ViewProgress, Choice::NewSession],
        }
    }

    pub fn offers(&self, choice: Choice) -> bool {
        self.choices().contains(&choice)
    }
}

/// Drives one session from countdown to a saved record.
///
/// All methods take `&mut self`, so at most one save can be in flight.
pub struct CompletionMachine {
    plan: SessionPlan,
    clock: Arc<dyn Clock>,
    countdown: Countdown,
    state: CompletionState,
    pending: Option<PendingDecision>,
    notes: String,
    failures: u32,
    /// Whether reaching zero while running moves to `AwaitingNotes`.
    timeout_armed: bool,
    saved: Option<Session>,
}

impl CompletionMachine {
    /// Starts the countdown immediately.
    pub fn start(plan: SessionPlan, clock: Arc<dyn Clock>) -> Result<Self> {
        if plan.duration_minutes == 0 {
            return Err(DeepWorkError::Validation(
                "session duration must be positive".to_string(),
            ));
        }
        if plan.activity.trim().is_empty() {
            return Err(DeepWorkError::Validation(
                "session activity must not be empty".to_string(),
            ));
        }

        let countdown = Countdown::start(
            Duration::minutes(i64::from(plan.duration_minutes)),
            clock.now(),
        );
        info!(
            activity = %plan.activity,
            duration = plan.duration_minutes,
            music = %plan.music_choice,
            "Session started"
        );

        Ok(Self {
            plan,
            clock,
            countdown,
            state: CompletionState::Running,
            pending: None,
            notes: String::new(),
            failures: 0,
            timeout_armed: true,
            saved: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> CompletionState {
        self.state
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn pending(&self) -> Option<&PendingDecision> {
        self.pending.as_ref()
    }

    pub fn remaining(&self) -> Duration {
        self.countdown.remaining(self.clock.now())
    }

    /// Fraction left, for a proportional progress indicator.
    pub fn progress(&self) -> f64 {
        self.countdown.progress(self.clock.now())
    }

    pub fn deadline(&self) -> Option<DateTime<Local>> {
        (self.state == CompletionState::Running).then(|| self.countdown.deadline(self.clock.now()))
    }

    /// Failed save attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn saved_session(&self) -> Option<&Session> {
        self.saved.as_ref()
    }

    fn invalid(&self, action: &'static str) -> DeepWorkError {
        DeepWorkError::InvalidTransition {
            state: self.state.as_str(),
            action,
        }
    }

    fn transition(&mut self, to: CompletionState) {
        info!(from = %self.state, to = %to, "Session state changed");
        self.state = to;
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Countdown
    // ─────────────────────────────────────────────────────────────────────────────

    /// Re-evaluates the countdown. Returns true when this call detected the timeout.
    pub fn poll(&mut self) -> bool {
        if self.state != CompletionState::Running || !self.timeout_armed {
            return false;
        }
        if !self.countdown.is_finished(self.clock.now()) {
            return false;
        }

        self.timeout_armed = false;
        self.pending = None;
        self.transition(CompletionState::AwaitingNotes);
        true
    }

    pub fn toggle_pause(&mut self) -> Result<CompletionState> {
        let now = self.clock.now();
        match self.state {
            CompletionState::Running => {
                self.countdown.pause(now);
                self.transition(CompletionState::Paused);
            }
            CompletionState::Paused => {
                self.countdown.resume(now);
                self.transition(CompletionState::Running);
            }
            _ => return Err(self.invalid("toggle pause")),
        }
        Ok(self.state)
    }

    /// Asks to end the session early; answered with `EndSession` or `KeepGoing`.
    pub fn request_end(&mut self) -> Result<()> {
        match self.state {
            CompletionState::Running | CompletionState::Paused => {
                self.pending = Some(PendingDecision::ConfirmEnd);
                Ok(())
            }
            _ => Err(self.invalid("end early")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────────────────────────

    /// Supplies the notes (possibly empty) and moves on to saving.
    pub fn submit_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        if self.state != CompletionState::AwaitingNotes {
            return Err(self.invalid("submit notes"));
        }
        self.notes = notes.into();
        self.transition(CompletionState::Saving);
        Ok(())
    }

    /// Makes one save attempt. Returns the resulting state.
    ///
    /// Repository failures are not errors here: they move the machine to
    /// `Failed` with a pending retry/cancel (or abandon/continue) decision.
    pub fn save(&mut self, sink: &dyn SessionSink) -> Result<CompletionState> {
        if self.state != CompletionState::Saving {
            return Err(self.invalid("save"));
        }

        let input = SessionInput {
            activity: self.plan.activity.clone(),
            duration: self.plan.duration_minutes,
            music_choice: self.plan.music_choice.clone(),
            notes: self.notes.clone(),
        };

        match sink.add_session(input) {
            Ok(session) => {
                self.saved = Some(session);
                self.pending = Some(PendingDecision::Finished);
                self.transition(CompletionState::Completed);
            }
            Err(err) => {
                self.failures += 1;
                let retry_allowed = self.failures < SAVE_RETRY_BUDGET;
                warn!(
                    error = %err,
                    attempts = self.failures,
                    retry_allowed,
                    "Session save failed"
                );
                self.pending = Some(PendingDecision::SaveFailed {
                    attempts: self.failures,
                    error: err.to_string(),
                    retry_allowed,
                });
                self.transition(CompletionState::Failed);
            }
        }
        Ok(self.state)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────────

    /// Answers the pending decision.
    ///
    /// Returns a navigation token when the answer asks to leave the session view.
    pub fn resolve(&mut self, choice: Choice) -> Result<Option<&'static str>> {
        let offered = self
            .pending
            .as_ref()
            .map(|pending| pending.offers(choice))
            .unwrap_or(false);
        if !offered {
            return Err(self.invalid(choice.as_str()));
        }
        self.pending = None;

        match choice {
            Choice::EndSession | Choice::Abandon => {
                self.transition(CompletionState::Abandoned);
            }
            Choice::KeepGoing => {}
            Choice::Retry => {
                self.transition(CompletionState::Saving);
            }
            Choice::Cancel => {
                // Remaining is still zero, so the next poll times out again.
                self.timeout_armed = true;
                self.transition(CompletionState::Running);
            }
            Choice::Continue => {
                self.timeout_armed = false;
                self.transition(CompletionState::Running);
            }
            Choice::ViewProgress => return Ok(Some(ROUTE_METRICS)),
            Choice::NewSession => return Ok(Some(ROUTE_HOME)),
        }
        Ok(None)
    }
}
