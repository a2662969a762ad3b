//! DeepWorkEngine - the single entry point for DeepWork clients.
//!
//! The engine owns one `DocumentStore` and hands the same instance to both
//! repositories, so every write to a document goes through one lock. It is:
//! - **Synchronous**: No async runtime required
//! - **Shareable**: `Send + Sync`, wrap in `Arc` to use from several threads
//! - **Clock-injected**: tests drive time with `ManualClock`
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use deepwork_core::{DeepWorkEngine, SessionPlan};
//!
//! let engine = DeepWorkEngine::new()?;
//! let mut session = engine.start_session(plan)?;
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::completion::{CompletionMachine, SessionPlan};
use crate::config::{load_config, DeepWorkConfig};
use crate::error::Result;
use crate::metrics::{daily_activity, DayActivity};
use crate::sessions::SessionRepository;
use crate::settings::SettingsRepository;
use crate::storage::StorageConfig;
use crate::store::{DocKey, DocumentStore, RepairReport};

/// Integrity status of one document, as reported by `health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHealth {
    pub doc: DocKey,
    pub valid: bool,
    /// Present when a repair ran.
    pub repair: Option<RepairReport>,
}

pub struct DeepWorkEngine {
    store: Arc<DocumentStore>,
    clock: Arc<dyn Clock>,
    config: DeepWorkConfig,
    sessions: SessionRepository,
    settings: SettingsRepository,
}

impl DeepWorkEngine {
    /// Engine over the default data root and the system clock.
    pub fn new() -> Result<Self> {
        Self::with_storage(StorageConfig::default(), Arc::new(SystemClock))
    }

    /// Engine over a custom data root and clock. Used by tests.
    pub fn with_storage(storage: StorageConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let config = load_config(&storage).unwrap_or_else(|err| {
            warn!(error = %err, "Ignoring unusable config; using defaults");
            DeepWorkConfig::default()
        });
        let store = Arc::new(DocumentStore::new(storage));
        store.initialize()?;

        Ok(Self {
            sessions: SessionRepository::new(store.clone(), clock.clone()),
            settings: SettingsRepository::new(store.clone()),
            store,
            clock,
            config,
        })
    }

    pub fn storage(&self) -> &StorageConfig {
        self.store.storage()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &DeepWorkConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    /// Starts a countdown. Save the result through `sessions()`.
    pub fn start_session(&self, plan: SessionPlan) -> Result<CompletionMachine> {
        CompletionMachine::start(plan, self.clock.clone())
    }

    /// Activity grid for the `days` days ending today.
    pub fn daily_activity(&self, days: u32) -> Vec<DayActivity> {
        daily_activity(&self.sessions.get_sessions(), self.today(), days)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Verifies every document, repairing the damaged ones when `repair` is set.
    pub fn health(&self, repair: bool) -> Result<Vec<DocumentHealth>> {
        DocKey::ALL
            .iter()
            .map(|&doc| {
                let valid = self.store.verify_integrity(doc);
                let repair = if !valid && repair {
                    Some(self.store.repair(doc)?)
                } else {
                    None
                };
                Ok(DocumentHealth { doc, valid, repair })
            })
            .collect()
    }
}
