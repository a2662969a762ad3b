//! Activities and duration presets.
//!
//! Every update is a whole-document read-modify-write under the settings
//! lock. Input is validated here as well as in the UI: a settings document
//! that reaches disk always has unique activity ids and exactly three
//! unique positive duration presets.

use std::sync::Arc;

use tracing::info;

use crate::error::{DeepWorkError, Result};
use crate::store::DocumentStore;
use crate::types::{
    validate_activities, validate_durations, Activity, Settings, DURATION_PRESET_COUNT,
};

pub struct SettingsRepository {
    store: Arc<DocumentStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or the defaults if none were saved yet.
    pub fn get_settings(&self) -> Settings {
        self.store.read()
    }

    pub fn update_activities(&self, activities: Vec<Activity>) -> Result<()> {
        validate_activities(&activities)?;
        let count = activities.len();
        self.store.mutate::<Settings, _, _>(|settings| {
            settings.activities = activities;
            Ok(())
        })?;
        info!(count, "Activities updated");
        Ok(())
    }

    pub fn update_durations(&self, durations: Vec<u32>) -> Result<()> {
        validate_durations(&durations)?;
        self.store.mutate::<Settings, _, _>(|settings| {
            settings.durations = durations.clone();
            Ok(())
        })?;
        info!(?durations, "Duration presets updated");
        Ok(())
    }

    /// Replaces the whole settings document.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.store.write(&settings)?;
        info!(activities = settings.activities.len(), "Settings replaced");
        Ok(())
    }

    /// Adds an activity whose id is derived from `name`.
    pub fn add_activity(&self, name: &str, color: &str) -> Result<Activity> {
        let activity = Activity::new(name, color)?;
        self.store.mutate::<Settings, _, _>(|settings| {
            if settings.find_activity(&activity.id).is_some() {
                return Err(DeepWorkError::Validation(format!(
                    "activity already exists: {}",
                    activity.id
                )));
            }
            settings.activities.push(activity.clone());
            Ok(())
        })?;
        info!(id = %activity.id, "Activity added");
        Ok(activity)
    }

    /// Removes an activity. Sessions that reference it keep the id.
    ///
    /// Returns false when no activity had that id.
    pub fn delete_activity(&self, id: &str) -> Result<bool> {
        let removed = self.store.mutate::<Settings, _, _>(|settings| {
            let before = settings.activities.len();
            settings.activities.retain(|a| a.id != id);
            Ok(settings.activities.len() != before)
        })?;
        if removed {
            info!(id, "Activity deleted");
        }
        Ok(removed)
    }

    pub fn set_activity_color(&self, id: &str, color: &str) -> Result<()> {
        self.store.mutate::<Settings, _, _>(|settings| {
            let activity = settings
                .activities
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| DeepWorkError::ActivityNotFound(id.to_string()))?;
            activity.color = color.to_string();
            Ok(())
        })
    }
}

/// In-progress pick of duration presets.
///
/// Picking a selected value drops it. Picking a fourth value starts over
/// with just that value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationSelection {
    selected: Vec<u32>,
}

impl DurationSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, minutes: u32) {
        if let Some(pos) = self.selected.iter().position(|&m| m == minutes) {
            self.selected.remove(pos);
        } else if self.selected.len() == DURATION_PRESET_COUNT {
            self.selected = vec![minutes];
        } else {
            self.selected.push(minutes);
        }
    }

    pub fn selected(&self) -> &[u32] {
        &self.selected
    }

    pub fn is_complete(&self) -> bool {
        self.selected.len() == DURATION_PRESET_COUNT
    }

    /// The preset list, once exactly three values are selected.
    pub fn finish(&self) -> Option<Vec<u32>> {
        self.is_complete().then(|| self.selected.clone())
    }
}
