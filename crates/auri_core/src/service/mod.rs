//! Feature-level use-case services over local stores.
//!
//! # Responsibility
//! - Validate and normalize UI input before it reaches a store.
//! - Expose only the operations each feature supports (e.g. only roleplays
//!   can be deleted).
//!
//! # Invariants
//! - Services never bypass `LocalStore` persistence.

use crate::store::local_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_service;
pub mod memory_service;
pub mod roleplay_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input rejected before touching storage.
    Validation(String),
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Trims `value`, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Trims `value` and rejects blank input.
pub(crate) fn require_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
