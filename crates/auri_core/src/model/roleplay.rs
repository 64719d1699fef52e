//! Custom roleplay payload: a user-authored practice scenario.

use super::record::{InsertOrder, RecordPayload, StoreOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CUSTOM_ROLEPLAYS_KEY: &str = "auri.custom_roleplays";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRoleplay {
    pub title: String,
    /// Situation description shown to the user and fed to the model.
    pub scenario: String,
    /// Character the assistant plays (e.g. "my manager").
    pub partner_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl RecordPayload for CustomRoleplay {
    fn store_options() -> StoreOptions {
        StoreOptions::new(CUSTOM_ROLEPLAYS_KEY, InsertOrder::NewestFirst)
    }

    fn remote_table() -> Option<&'static str> {
        Some("custom_roleplays")
    }

    fn remote_fields(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("title".to_string(), Value::String(self.title.clone()));
        row.insert("scenario".to_string(), Value::String(self.scenario.clone()));
        row.insert(
            "partner_role".to_string(),
            Value::String(self.partner_role.clone()),
        );
        row.insert(
            "goal".to_string(),
            self.goal.clone().map_or(Value::Null, Value::String),
        );
        row
    }
}
