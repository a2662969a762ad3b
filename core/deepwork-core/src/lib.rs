//! # deepwork-core
//!
//! Core library for DeepWork, a timed focus-session tracker: durable session
//! records, user settings, and the state machine that carries a finished
//! countdown through notes and saving.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap with async if needed.
//! - **One writer per document**: Every mutation of a document is serialized
//!   through the `DocumentStore` that owns it.
//! - **Graceful degradation**: Missing files return default values, not errors.
//!   Damaged files are read leniently and only rewritten by an explicit repair.
//! - **Injected time**: Everything that reads the clock takes a `Clock`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deepwork_core::DeepWorkEngine;
//!
//! let engine = DeepWorkEngine::new()?;
//! let today = engine.sessions().get_sessions_by_date("2024-02-15");
//! let totals = engine.sessions().get_totals_by_activity();
//! ```

// Public modules
pub mod clock;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod patterns;
pub mod sessions;
pub mod settings;
pub mod storage;
pub mod store;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::*;
pub use config::*;
pub use engine::{DeepWorkEngine, DocumentHealth};
pub use error::{DeepWorkError, Result};
pub use metrics::*;
pub use sessions::*;
pub use settings::*;
pub use storage::*;
pub use store::{DocKey, Document, DocumentStore, RepairReport};
pub use types::*;
