//! Client-side daily message limit for the free tier.
//!
//! # Invariants
//! - The counter resets when the UTC calendar day changes.
//! - Premium plans are never limited and never counted.
//! - Malformed persisted state reads as a fresh day.

use crate::kv::{KvBackend, KvError};
use chrono::{NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

pub const USAGE_METER_KEY: &str = "auri.usage_meter";
pub const DEFAULT_DAILY_MESSAGE_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct UsageState {
    day: NaiveDate,
    count: u32,
}

/// Usage for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub used: u32,
    /// `None` for unlimited plans.
    pub limit: Option<u32>,
}

impl UsageSnapshot {
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    LimitReached { limit: u32 },
    Kv(KvError),
}

impl Display for UsageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitReached { limit } => write!(f, "daily message limit of {limit} reached"),
            Self::Kv(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UsageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::LimitReached { .. } => None,
        }
    }
}

impl From<KvError> for UsageError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

pub struct UsageMeter {
    backend: Arc<dyn KvBackend>,
    daily_limit: u32,
    count_lock: Mutex<()>,
}

impl UsageMeter {
    pub fn new(backend: Arc<dyn KvBackend>, daily_limit: u32) -> Self {
        Self {
            backend,
            daily_limit,
            count_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self, plan: Plan) -> UsageSnapshot {
        self.snapshot_on(plan, today())
    }

    pub fn snapshot_on(&self, plan: Plan, day: NaiveDate) -> UsageSnapshot {
        match plan {
            Plan::Premium => UsageSnapshot {
                used: 0,
                limit: None,
            },
            Plan::Free => UsageSnapshot {
                used: self.count_on(day),
                limit: Some(self.daily_limit),
            },
        }
    }

    /// Counts one sent message.
    ///
    /// # Errors
    /// - `UsageError::LimitReached` when the free quota for today is used up;
    ///   the counter is left unchanged.
    pub fn record_message(&self, plan: Plan) -> Result<UsageSnapshot, UsageError> {
        self.record_message_on(plan, today())
    }

    pub fn record_message_on(
        &self,
        plan: Plan,
        day: NaiveDate,
    ) -> Result<UsageSnapshot, UsageError> {
        if plan == Plan::Premium {
            return Ok(self.snapshot_on(plan, day));
        }

        let _guard = self.count_lock.lock().unwrap_or_else(|err| err.into_inner());
        let used = self.count_on(day);
        if used >= self.daily_limit {
            return Err(UsageError::LimitReached {
                limit: self.daily_limit,
            });
        }

        let state = UsageState {
            day,
            count: used + 1,
        };
        let raw = serde_json::to_string(&state)
            .map_err(|err| KvError::Backend(format!("usage encode failed: {err}")))?;
        self.backend.set(USAGE_METER_KEY, &raw)?;

        Ok(UsageSnapshot {
            used: state.count,
            limit: Some(self.daily_limit),
        })
    }

    fn count_on(&self, day: NaiveDate) -> u32 {
        let raw = match self.backend.get(USAGE_METER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(err) => {
                warn!("event=usage_read module=chat status=error error={err}");
                return 0;
            }
        };
        match serde_json::from_str::<UsageState>(&raw) {
            Ok(state) if state.day == day => state.count,
            Ok(_) => 0,
            Err(err) => {
                warn!("event=usage_read module=chat status=corrupt error={err}");
                0
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
