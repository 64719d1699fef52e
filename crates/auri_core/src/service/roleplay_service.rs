//! Custom roleplay use-cases.

use super::{normalize_optional_text, require_text, ServiceError, ServiceResult};
use crate::model::record::{Record, RecordId};
use crate::model::roleplay::CustomRoleplay;
use crate::store::local_store::LocalStore;

const MAX_TITLE_CHARS: usize = 80;

/// Raw user input for a new roleplay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRoleplay {
    pub title: String,
    pub scenario: String,
    pub partner_role: String,
    pub goal: Option<String>,
}

pub struct RoleplayService {
    store: LocalStore<CustomRoleplay>,
}

impl RoleplayService {
    pub fn new(store: LocalStore<CustomRoleplay>) -> Self {
        Self { store }
    }

    /// Validates and stores a roleplay.
    ///
    /// # Errors
    /// - `ServiceError::Validation` for blank title/scenario or an overlong
    ///   title.
    pub fn create(&self, input: NewRoleplay) -> ServiceResult<Record<CustomRoleplay>> {
        let title = require_text("title", &input.title)?;
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::Validation(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        let scenario = require_text("scenario", &input.scenario)?;
        let partner_role = normalize_optional_text(Some(&input.partner_role))
            .unwrap_or_else(|| "partner".to_string());

        let payload = CustomRoleplay {
            title,
            scenario,
            partner_role,
            goal: normalize_optional_text(input.goal.as_deref()),
        };
        Ok(self.store.append(payload)?)
    }

    pub fn list(&self) -> Vec<Record<CustomRoleplay>> {
        self.store.list()
    }

    pub fn get(&self, id: RecordId) -> Option<Record<CustomRoleplay>> {
        self.store.get(id)
    }

    /// Deletes a roleplay; returns whether one was removed.
    pub fn delete(&self, id: RecordId) -> ServiceResult<bool> {
        Ok(self.store.remove(id)?)
    }

    pub(crate) fn store(&self) -> &LocalStore<CustomRoleplay> {
        &self.store
    }
}
