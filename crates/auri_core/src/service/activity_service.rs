//! Activity log use-cases.
//!
//! Logged activities cannot be removed through the service; the backing
//! store stays crate-private:
//!
//! ```compile_fail
//! use auri_core::service::activity_service::ActivityService;
//!
//! fn wipe(service: &ActivityService) {
//!     service.store().clear().unwrap();
//! }
//! ```

use super::{normalize_optional_text, ServiceResult};
use crate::model::activity_log::{ActivityCategory, ActivityLog};
use crate::model::record::Record;
use crate::store::local_store::LocalStore;

/// Newest-first, uncapped log of user activities.
pub struct ActivityService {
    store: LocalStore<ActivityLog>,
}

impl ActivityService {
    pub fn new(store: LocalStore<ActivityLog>) -> Self {
        Self { store }
    }

    /// Logs one activity. Blank notes are stored as `None`.
    pub fn log(
        &self,
        category: ActivityCategory,
        note: Option<&str>,
    ) -> ServiceResult<Record<ActivityLog>> {
        let payload = ActivityLog {
            category,
            note: normalize_optional_text(note),
        };
        Ok(self.store.append(payload)?)
    }

    pub fn list(&self) -> Vec<Record<ActivityLog>> {
        self.store.list()
    }

    pub fn list_by_category(&self, category: ActivityCategory) -> Vec<Record<ActivityLog>> {
        self.store
            .list()
            .into_iter()
            .filter(|record| record.payload.category == category)
            .collect()
    }

    pub(crate) fn store(&self) -> &LocalStore<ActivityLog> {
        &self.store
    }
}
