//! Activity log payload: what the user did and an optional note.

use super::record::{InsertOrder, RecordPayload, StoreOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const ACTIVITY_LOGS_KEY: &str = "auri.activity_logs";

/// Category tag for one logged activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Mood,
    Exercise,
    Journal,
    Breathing,
    Sleep,
    Chat,
    Other,
}

impl ActivityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Exercise => "exercise",
            Self::Journal => "journal",
            Self::Breathing => "breathing",
            Self::Sleep => "sleep",
            Self::Chat => "chat",
            Self::Other => "other",
        }
    }
}

impl Display for ActivityCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mood" => Ok(Self::Mood),
            "exercise" => Ok(Self::Exercise),
            "journal" => Ok(Self::Journal),
            "breathing" => Ok(Self::Breathing),
            "sleep" => Ok(Self::Sleep),
            "chat" => Ok(Self::Chat),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown activity category `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub category: ActivityCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RecordPayload for ActivityLog {
    fn store_options() -> StoreOptions {
        StoreOptions::new(ACTIVITY_LOGS_KEY, InsertOrder::NewestFirst)
    }

    fn remote_table() -> Option<&'static str> {
        Some("activity_logs")
    }

    fn remote_fields(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert(
            "category".to_string(),
            Value::String(self.category.as_str().to_string()),
        );
        row.insert(
            "note".to_string(),
            self.note.clone().map_or(Value::Null, Value::String),
        );
        row
    }
}
