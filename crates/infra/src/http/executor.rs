//! HTTP execution sink
//!
//! Each pending action becomes `POST {base}/actions/{type}` with the action
//! payload as the JSON body. The action id travels in the `Idempotency-Key`
//! header so the server can drop a replay of a request whose response was
//! lost.

use std::time::Duration;

use async_trait::async_trait;
use carebridge_core::{ExecutionError, ExecutionSink};
use carebridge_domain::{CareBridgeError, PendingAction, RemoteConfig, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{build_client, parse_base_url};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const RETRY_COUNT_HEADER: &str = "X-CareBridge-Retry-Count";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Executes pending actions against the CRM REST API
#[derive(Debug, Clone)]
pub struct HttpExecutionSink {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpExecutionSink {
    /// Build a sink for `base_url`
    ///
    /// # Errors
    /// Returns [`CareBridgeError::Config`] for an invalid URL or HTTP client
    /// settings.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self { client: build_client(timeout)?, base_url: parse_base_url(base_url)?, timeout })
    }

    /// Build a sink from the `remote` configuration section
    ///
    /// # Errors
    /// Returns [`CareBridgeError::Config`] when `remote.base_url` is unset
    /// or invalid.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            CareBridgeError::Config("remote.base_url is required for HTTP execution".into())
        })?;
        Self::new(base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, action_type: &str) -> std::result::Result<Url, ExecutionError> {
        let valid = !action_type.is_empty()
            && action_type.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ExecutionError::Unsupported(action_type.to_string()));
        }
        self.base_url
            .join(&format!("actions/{action_type}"))
            .map_err(|_| ExecutionError::Unsupported(action_type.to_string()))
    }

    fn map_send_error(&self, err: &reqwest::Error) -> ExecutionError {
        if err.is_timeout() {
            ExecutionError::Timeout(self.timeout)
        } else {
            ExecutionError::Network(err.to_string())
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

/// Map a non-success status to the reconciler's error taxonomy
fn status_error(status: StatusCode, headers: &HeaderMap, body: String) -> ExecutionError {
    let message = truncate_body(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            ExecutionError::RateLimited { retry_after: retry_after(headers) }
        }
        StatusCode::REQUEST_TIMEOUT => {
            ExecutionError::Server { status: status.as_u16(), message }
        }
        s if s.is_server_error() => ExecutionError::Server { status: s.as_u16(), message },
        s => ExecutionError::Rejected { status: s.as_u16(), message },
    }
}

#[async_trait]
impl ExecutionSink for HttpExecutionSink {
    #[instrument(
        skip(self, action),
        fields(action_id = %action.id, action_type = %action.action_type)
    )]
    async fn execute(&self, action: &PendingAction) -> std::result::Result<(), ExecutionError> {
        let url = self.endpoint(&action.action_type)?;

        let response = self
            .client
            .post(url)
            .header(IDEMPOTENCY_HEADER, action.id.as_str())
            .header(RETRY_COUNT_HEADER, action.retry_count.to_string())
            .json(&action.payload)
            .send()
            .await
            .map_err(|err| self.map_send_error(&err))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "action executed");
            return Ok(());
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, &headers, body);
        warn!(%status, error = %err, "remote rejected action");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use carebridge_core::offline::errors::ExecutionErrorCategory;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn action(action_type: &str) -> PendingAction {
        PendingAction::new(action_type, json!({ "name": "Ada Lovelace" }), 1_700_000_000_000)
    }

    fn sink(server: &MockServer) -> HttpExecutionSink {
        HttpExecutionSink::new(&server.uri(), Duration::from_secs(2)).expect("sink")
    }

    #[tokio::test]
    async fn posts_payload_with_idempotency_key() {
        let server = MockServer::start().await;
        let action = action("createContact");

        Mock::given(method("POST"))
            .and(path("/actions/createContact"))
            .and(header(IDEMPOTENCY_HEADER, action.id.as_str()))
            .and(header(RETRY_COUNT_HEADER, "0"))
            .and(body_json(json!({ "name": "Ada Lovelace" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        sink(&server).execute(&action).await.expect("executed");
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = sink(&server).execute(&action("createDeal")).await.unwrap_err();
        assert!(matches!(
            &err,
            ExecutionError::Server { status: 503, message } if message == "maintenance"
        ));
        assert_eq!(err.category(), ExecutionErrorCategory::Server);
    }

    #[tokio::test]
    async fn client_errors_are_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("email is invalid"))
            .mount(&server)
            .await;

        let err = sink(&server).execute(&action("sendEmail")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected { status: 422, .. }));
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = sink(&server).execute(&action("logActivity")).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let sink = HttpExecutionSink::new(&server.uri(), Duration::from_millis(50)).unwrap();
        let err = sink.execute(&action("createContact")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let sink =
            HttpExecutionSink::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1))
                .unwrap();

        let err = sink.execute(&action("createContact")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_action_type_is_unsupported_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = sink(&server).execute(&action("../admin")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unsupported(t) if t == "../admin"));
    }

    #[test]
    fn from_config_requires_base_url() {
        let err = HttpExecutionSink::from_config(&RemoteConfig::default()).unwrap_err();
        assert!(matches!(err, CareBridgeError::Config(_)));
    }
}
