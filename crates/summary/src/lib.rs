//! # PRS Summary
//!
//! HTTP client for the external document summarisation service.
//!
//! The service exposes a single operation:
//!
//! ```text
//! POST {base_url}/summarize
//! { "pdf_urls": ["https://…/report.pdf", …] }
//!
//! 200 { "summary": "…" }
//! 4xx/5xx { "error": "…" }
//! ```
//!
//! One request is made per call. There are no retries, and no timeout unless one is
//! configured. Failures are reported with the upstream status and message intact so they
//! can be shown to the user verbatim.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors returned by [`SummaryClient`].
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("invalid summarisation base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("cannot connect to summarisation service at {url}: {message}")]
    Connection { url: String, message: String },

    #[error("summarisation request failed: {0}")]
    HttpClient(String),

    #[error("summarisation service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected summarisation response: {0}")]
    ResponseParsing(String),
}

pub type SummaryResult<T> = Result<T, SummaryError>;

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    pdf_urls: &'a [String],
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for the summarisation endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct SummaryClient {
    base_url: String,
    client: reqwest::Client,
}

impl SummaryClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme and authority (and optional path prefix) of the service
    /// * `timeout` - Optional whole-request timeout; `None` keeps the HTTP client default
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::InvalidBaseUrl`] if `base_url` is not an absolute http(s) URL,
    /// or [`SummaryError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> SummaryResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| SummaryError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SummaryError::InvalidBaseUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SummaryError::HttpClient(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests a summary of the documents at `document_urls`.
    ///
    /// # Errors
    ///
    /// - [`SummaryError::Connection`] if the service cannot be reached
    /// - [`SummaryError::HttpClient`] for other transport failures (including timeouts and
    ///   an error body that cannot be read)
    /// - [`SummaryError::Status`] for a non-2xx response; `message` is the service's `error`
    ///   field when present, otherwise the raw response body
    /// - [`SummaryError::ResponseParsing`] if a 2xx response has no `summary` string
    pub async fn summarize(&self, document_urls: &[String]) -> SummaryResult<String> {
        let url = format!("{}/summarize", self.base_url);
        let body = SummarizeRequest {
            pdf_urls: document_urls,
        };

        tracing::debug!(documents = document_urls.len(), "requesting summary");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SummaryError::Connection {
                        url: self.base_url.clone(),
                        message: e.to_string(),
                    }
                } else {
                    SummaryError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| SummaryError::HttpClient(e.to_string()))?;
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => err.error,
                Err(_) => body,
            };
            tracing::warn!(status = status.as_u16(), %message, "summarisation failed");
            return Err(SummaryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SummarizeResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::ResponseParsing(e.to_string()))?;

        Ok(parsed.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_summarize_returns_summary_text() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/summarize",
                post(
                    |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        Json(json!({ "summary": "ok" }))
                    },
                ),
            )
            .with_state(seen.clone());
        let base = spawn_stub(router).await;

        let client = SummaryClient::new(&base, None).unwrap();
        let summary = client
            .summarize(&["https://x/y.pdf".to_string()])
            .await
            .unwrap();

        assert_eq!(summary, "ok");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], json!({ "pdf_urls": ["https://x/y.pdf"] }));
    }

    #[tokio::test]
    async fn test_summarize_surfaces_service_error_verbatim() {
        let router = Router::new().route(
            "/summarize",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to extract text from PDF" })),
                )
            }),
        );
        let base = spawn_stub(router).await;

        let client = SummaryClient::new(&format!("{}/", base), None).unwrap();
        let err = client
            .summarize(&["https://x/y.pdf".to_string()])
            .await
            .unwrap_err();

        match err {
            SummaryError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Failed to extract text from PDF");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_summarize_keeps_raw_body_when_not_json() {
        let router = Router::new().route(
            "/summarize",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn_stub(router).await;

        let client = SummaryClient::new(&base, None).unwrap();
        let err = client.summarize(&[]).await.unwrap_err();

        assert!(matches!(
            err,
            SummaryError::Status { status: 502, ref message } if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_summarize_rejects_response_without_summary() {
        let router = Router::new().route(
            "/summarize",
            post(|| async { Json(json!({ "result": "ok" })) }),
        );
        let base = spawn_stub(router).await;

        let client = SummaryClient::new(&base, None).unwrap();
        let err = client
            .summarize(&["https://x/y.pdf".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::ResponseParsing(_)));
    }

    #[tokio::test]
    async fn test_summarize_reports_connection_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SummaryClient::new(&format!("http://{}", addr), None).unwrap();
        let err = client
            .summarize(&["https://x/y.pdf".to_string()])
            .await
            .unwrap_err();

        match err {
            SummaryError::Connection { url, message } => {
                assert_eq!(url, format!("http://{}", addr));
                assert!(!message.is_empty());
            }
            other => panic!("expected Connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_summarize_reports_truncated_error_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let client = SummaryClient::new(&format!("http://{}", addr), None).unwrap();
        let err = client
            .summarize(&["https://x/y.pdf".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::HttpClient(_)), "{:?}", err);
    }

    #[test]
    fn test_new_rejects_non_http_base_url() {
        assert!(matches!(
            SummaryClient::new("ftp://files.example", None),
            Err(SummaryError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            SummaryClient::new("localhost:3000", None),
            Err(SummaryError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client =
            SummaryClient::new("http://127.0.0.1:3000/", Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }
}
