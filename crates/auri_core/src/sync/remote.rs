//! Remote write contract and its error type.

use super::session::Session;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection, DNS or TLS failure.
    Transport(String),
    Timeout,
    /// Credential rejected by the remote service.
    Unauthorized,
    /// Unexpected status. Only the service's error `code` is kept; response
    /// bodies may echo the submitted row.
    Http { status: u16, code: Option<String> },
    /// Client could not be configured.
    Config(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "network error: {message}"),
            Self::Timeout => write!(f, "remote request timed out"),
            Self::Unauthorized => write!(f, "remote rejected credentials"),
            Self::Http {
                status,
                code: Some(code),
            } => write!(f, "http {status} ({code})"),
            Self::Http { status, code: None } => write!(f, "http {status}"),
            Self::Config(message) => write!(f, "remote client misconfigured: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Write-only remote table access.
///
/// Writes are upserts keyed by the row's `id`, so replaying the same record
/// is harmless.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn upsert(
        &self,
        table: &str,
        row: &Map<String, Value>,
        session: &Session,
    ) -> RemoteResult<()>;
}
