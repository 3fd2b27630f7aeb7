//! Outbound webhook calls.
//!
//! `HttpTransport` is the network port: it sends one request and either
//! returns the response or a `TransportError`. `HttpExecutor` sits on top,
//! applies the configured timeout and turns every result into a status code
//! and body text, with `0` standing for "no response".

use crate::error::TransportError;
use crate::execution::{ExecutionStatus, NO_RESPONSE};
use crate::task::{Headers, HttpMethod, Task};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A webhook request built from a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

impl HttpRequest {
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            method: task.method,
            url: task.url.clone(),
            headers: task.headers.clone(),
            body: task.payload.clone(),
        }
    }
}

/// The response to a webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
}

/// Sends webhook requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request, giving up after `timeout`.
    async fn send_request(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// `HttpTransport` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::ClientBuild {
                reason: describe(&e),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = reqwest::Url::parse(&request.url).map_err(|e| TransportError::InvalidRequest {
            reason: format!("invalid url '{}': {e}", request.url),
        })?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .timeout(timeout);

        for header in request.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest {
                    reason: format!("invalid header name '{}': {e}", header.name),
                }
            })?;
            let value =
                HeaderValue::from_str(&header.value).map_err(|e| TransportError::InvalidRequest {
                    reason: format!("invalid value for header '{}': {e}", header.name),
                })?;
            builder = builder.header(name, value);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send_request(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .build(request, timeout)?
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                // The status line arrived, so the attempt still counts as answered.
                warn!(url = %request.url, status_code, error = %describe(&e), "failed to read webhook response body");
                String::new()
            }
        };

        Ok(HttpResponse { status_code, body })
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> TransportError {
    let reason = describe(error);
    if error.is_timeout() {
        TransportError::Timeout {
            timeout_secs: timeout.as_secs(),
            reason,
        }
    } else if error.is_builder() {
        TransportError::InvalidRequest { reason }
    } else {
        TransportError::ConnectionFailed { reason }
    }
}

/// Renders an error with its source chain, e.g.
/// `error sending request: tcp connect error: Connection refused`.
fn describe(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Result of one webhook attempt, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: ExecutionStatus,
    /// Response status, or `0` if no response was received.
    pub status_code: u16,
    /// Response body, or the transport failure description.
    pub body: String,
}

impl Outcome {
    fn from_response(response: HttpResponse) -> Self {
        Self {
            status: ExecutionStatus::from_status_code(response.status_code),
            status_code: response.status_code,
            body: response.body,
        }
    }

    fn from_transport_error(error: &TransportError) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            status_code: NO_RESPONSE,
            body: error.to_string(),
        }
    }
}

/// Executes a task's webhook under a fixed timeout.
#[derive(Clone)]
pub struct HttpExecutor {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls the task's webhook once. Never fails: transport errors come back
    /// as a `failed` outcome with status code 0.
    pub async fn execute(&self, task: &Task) -> Outcome {
        let request = HttpRequest::for_task(task);
        match self.transport.send_request(&request, self.timeout).await {
            Ok(response) => {
                debug!(task_id = %task.id, status_code = response.status_code, "webhook answered");
                Outcome::from_response(response)
            }
            Err(e) => {
                warn!(task_id = %task.id, url = %task.url, error = %e, "webhook request failed");
                Outcome::from_transport_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{Cadence, CadenceUnit};
    use crate::task::Header;
    use axum::Router;
    use axum::http::{HeaderMap, Method, StatusCode};
    use axum::routing::{any, get, post};
    use std::net::SocketAddr;
    use taskhook_core::ServiceId;

    async fn echo(method: Method, headers: HeaderMap, body: String) -> String {
        let token = headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        format!("{method} {token} {body}")
    }

    async fn spawn_server() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { "pong" }))
            .route(
                "/fail",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/echo", any(echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn task(url: String, method: HttpMethod) -> Task {
        Task::new(
            ServiceId::new(),
            "hook",
            url,
            method,
            Cadence::new(1, CadenceUnit::Hour).unwrap(),
        )
        .unwrap()
    }

    fn executor(timeout: Duration) -> HttpExecutor {
        HttpExecutor::new(Arc::new(ReqwestTransport::new().unwrap()), timeout)
    }

    #[tokio::test]
    async fn success_returns_status_and_body() {
        let addr = spawn_server().await;
        let outcome = executor(Duration::from_secs(5))
            .execute(&task(format!("http://{addr}/ok"), HttpMethod::Get))
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.body, "pong");
    }

    #[tokio::test]
    async fn server_error_is_failed_with_real_status() {
        let addr = spawn_server().await;
        let outcome = executor(Duration::from_secs(5))
            .execute(&task(format!("http://{addr}/fail"), HttpMethod::Post))
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert_eq!(outcome.status_code, 500);
        assert_eq!(outcome.body, "boom");
    }

    #[tokio::test]
    async fn headers_and_payload_are_sent() {
        let addr = spawn_server().await;
        let hook = task(format!("http://{addr}/echo"), HttpMethod::Put)
            .with_headers(Headers::parse([("X-Token", "abc")]).unwrap())
            .with_payload(r#"{"a":1}"#);

        let outcome = executor(Duration::from_secs(5)).execute(&hook).await;

        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.body, r#"PUT abc {"a":1}"#);
    }

    #[tokio::test]
    async fn timeout_is_status_zero_with_description() {
        let addr = spawn_server().await;
        let outcome = executor(Duration::from_millis(200))
            .execute(&task(format!("http://{addr}/slow"), HttpMethod::Get))
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert_eq!(outcome.status_code, NO_RESPONSE);
        assert!(outcome.body.contains("timed out"), "body: {}", outcome.body);
    }

    #[tokio::test]
    async fn connection_refused_is_status_zero() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = executor(Duration::from_secs(5))
            .execute(&task(format!("http://{addr}/ok"), HttpMethod::Get))
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert_eq!(outcome.status_code, NO_RESPONSE);
        assert!(!outcome.body.is_empty());
    }

    #[tokio::test]
    async fn malformed_stored_header_fails_before_sending() {
        let hook = task("http://127.0.0.1:9/ok".to_string(), HttpMethod::Get).with_headers(
            Headers::from_stored(vec![Header {
                name: "X-Bad".to_string(),
                value: "a\nb".to_string(),
            }]),
        );

        let outcome = executor(Duration::from_secs(5)).execute(&hook).await;

        assert_eq!(outcome.status_code, NO_RESPONSE);
        assert!(outcome.body.contains("invalid value for header 'X-Bad'"));
    }

    #[tokio::test]
    async fn unparsable_url_fails_before_sending() {
        let outcome = executor(Duration::from_secs(5))
            .execute(&task("not a url".to_string(), HttpMethod::Get))
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.body.contains("invalid url"));
    }
}
