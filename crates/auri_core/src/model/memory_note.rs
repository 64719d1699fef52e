//! Memory note payload: facts Auri keeps about the user between chats.

use super::record::{InsertOrder, RecordPayload, StoreOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

pub const MEMORY_NOTES_KEY: &str = "auri.memory_notes";
pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

/// Who produced the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Extracted from a chat exchange.
    Chat,
    /// Written by the user directly.
    User,
}

impl MemorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::User => "user",
        }
    }
}

impl FromStr for MemorySource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "user" => Ok(Self::User),
            other => Err(format!("unknown memory source `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNote {
    pub content: String,
    pub source: MemorySource,
}

impl RecordPayload for MemoryNote {
    fn store_options() -> StoreOptions {
        StoreOptions::new(MEMORY_NOTES_KEY, InsertOrder::OldestFirst)
            .with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    fn remote_table() -> Option<&'static str> {
        Some("memory_notes")
    }

    fn remote_fields(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("content".to_string(), Value::String(self.content.clone()));
        row.insert(
            "source".to_string(),
            Value::String(self.source.as_str().to_string()),
        );
        row
    }
}
