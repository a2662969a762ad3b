//! Session countdown and the completion flow that turns it into a record.
//!
//! ```text
//!            toggle_pause
//!   Running <-----------> Paused
//!      |  ^                  |
//!      |  | cancel/continue  | request_end + EndSession
//!      |  |                  v
//!      |  +------ Failed --> Abandoned
//!      |            ^  |
//!  poll (timeout)   |  | retry
//!      v            |  v
//!  AwaitingNotes -> Saving -> Completed
//!       submit_notes      save
//! ```
//!
//! The timeout fires once per arming. A cancelled save re-arms it, so the
//! next poll (remaining is already zero) asks for notes again. After the
//! retry budget is spent, `Continue` resumes without re-arming.

mod countdown;
mod machine;

pub use countdown::{format_remaining, Countdown};
pub use machine::{
    Choice, CompletionMachine, CompletionState, PendingDecision, SessionPlan, ROUTE_HOME,
    ROUTE_METRICS, SAVE_RETRY_BUDGET,
};
