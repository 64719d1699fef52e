//! PostgREST-style remote sink over `reqwest`.
//!
//! # Responsibility
//! - Send one mirrored row per call to `{base_url}/rest/v1/{table}`.
//! - Map transport and status failures into `RemoteError`.
//!
//! # Invariants
//! - Exactly one request per call; retries are the caller's policy.
//! - Rows are upserted on `id` (`resolution=merge-duplicates`).

use super::remote::{RemoteError, RemoteResult, RemoteSink};
use super::session::Session;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;

const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=minimal";
const MAX_ERROR_CODE_LEN: usize = 16;

/// Remote sink for a backend-as-a-service REST endpoint.
#[derive(Debug, Clone)]
pub struct RestRemote {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestRemote {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::Config("base_url cannot be empty".to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("auri-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| RemoteError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Returns the endpoint receiving rows for `table`.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}

#[async_trait]
impl RemoteSink for RestRemote {
    async fn upsert(
        &self,
        table: &str,
        row: &Map<String, Value>,
        session: &Session,
    ) -> RemoteResult<()> {
        let res = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .header("Prefer", UPSERT_PREFER)
            .json(row)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
            status => {
                let status = status.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(RemoteError::Http {
                    status,
                    code: error_code(&body),
                })
            }
        }
    }
}

/// Extracts the short machine code (`"23502"`, `"PGRST204"`) from an error
/// body. `message`, `details` and `hint` are dropped since they can quote the
/// failing row.
fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = value.get("code")?.as_str()?;
    let valid = !code.is_empty()
        && code.len() <= MAX_ERROR_CODE_LEN
        && code.chars().all(|ch| ch.is_ascii_alphanumeric());
    valid.then(|| code.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{error_code, RestRemote};
    use crate::sync::remote::{RemoteError, RemoteSink};
    use crate::sync::session::Session;
    use serde_json::{json, Map, Value};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Accepts one connection, captures the raw request and answers with
    /// `status_line`.
    async fn serve_once(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        serve_once_with_body(status_line, "").await
    }

    async fn serve_once_with_body(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        });

        (base_url, rx)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn sample_row() -> Map<String, Value> {
        let Value::Object(row) = json!({"id": "r-1", "category": "mood"}) else {
            unreachable!()
        };
        row
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let remote =
            RestRemote::new("https://example.test/", "anon", RestRemote::DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            remote.table_url("activity_logs"),
            "https://example.test/rest/v1/activity_logs"
        );
    }

    #[test]
    fn rejects_blank_base_url() {
        let err = RestRemote::new("  ", "anon", RestRemote::DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[tokio::test]
    async fn upsert_sends_credentials_and_row() {
        let (base_url, captured) = serve_once("HTTP/1.1 201 Created").await;
        let remote = RestRemote::new(base_url, "anon-key", Duration::from_secs(5)).unwrap();

        remote
            .upsert("activity_logs", &sample_row(), &Session::new("user-1", "tok-1"))
            .await
            .unwrap();

        let request = captured.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /rest/v1/activity_logs http/1.1"));
        assert!(request.contains("apikey: anon-key"));
        assert!(request.contains("authorization: bearer tok-1"));
        assert!(request.contains("prefer: resolution=merge-duplicates"));
        assert!(request.contains("\"category\":\"mood\""));
    }

    #[tokio::test]
    async fn unauthorized_status_maps_to_unauthorized() {
        let (base_url, _captured) = serve_once("HTTP/1.1 401 Unauthorized").await;
        let remote = RestRemote::new(base_url, "anon-key", Duration::from_secs(5)).unwrap();

        let err = remote
            .upsert("activity_logs", &sample_row(), &Session::new("user-1", "expired"))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Unauthorized);
    }

    #[tokio::test]
    async fn server_error_maps_to_http() {
        let (base_url, _captured) = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let remote = RestRemote::new(base_url, "anon-key", Duration::from_secs(5)).unwrap();

        let err = remote
            .upsert("activity_logs", &sample_row(), &Session::new("user-1", "tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn error_body_echoing_the_row_is_reduced_to_its_code() {
        let (base_url, _captured) = serve_once_with_body(
            "HTTP/1.1 400 Bad Request",
            r#"{"code":"23502","message":"null value in column","details":"Failing row contains (I feel hopeless)"}"#,
        )
        .await;
        let remote = RestRemote::new(base_url, "anon-key", Duration::from_secs(5)).unwrap();

        let err = remote
            .upsert("activity_logs", &sample_row(), &Session::new("user-1", "tok"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Http {
                status: 400,
                code: Some("23502".to_string())
            }
        );
        let rendered = err.to_string();
        assert_eq!(rendered, "http 400 (23502)");
        assert!(!rendered.contains("hopeless"));
    }

    #[test]
    fn error_code_ignores_non_json_and_odd_codes() {
        assert_eq!(error_code("Failing row contains (secret)"), None);
        assert_eq!(error_code(r#"{"code":"has spaces (secret)"}"#), None);
        assert_eq!(error_code(r#"{"details":"secret"}"#), None);
        assert_eq!(error_code(r#"{"code":"PGRST204"}"#).as_deref(), Some("PGRST204"));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let remote = RestRemote::new(base_url, "anon-key", Duration::from_secs(5)).unwrap();
        let err = remote
            .upsert("activity_logs", &sample_row(), &Session::new("user-1", "tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
