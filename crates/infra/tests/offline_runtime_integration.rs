//! Integration tests for OfflineRuntime against a mock CRM API
//!
//! **Coverage:**
//! - Happy path: queue → HTTP 201 → queue empty, `synced` toast
//! - Server outage: 503 → background sync fires → retry succeeds
//! - Offline at startup: health check fails → watcher sees recovery → drain
//! - Missing transport is rejected at startup
//!
//! **Infrastructure:**
//! - WireMock HTTP server (simulates the CRM API)
//! - Real file storage in a tempdir

use std::time::Duration;

use carebridge_common::testing::poll_until;
use carebridge_domain::{
    CareBridgeError, CrmAction, NewContact, OfflineConfig, StatusEvent, StatusKind,
    StorageBackendKind,
};
use carebridge_infra::OfflineRuntime;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn config_for(server: &MockServer, dir: &TempDir) -> OfflineConfig {
    let mut config = OfflineConfig::default();
    config.storage.backend = StorageBackendKind::File;
    config.storage.path = dir.path().join("offline");
    config.remote.base_url = Some(server.uri());
    config.remote.request_timeout_secs = 2;
    config.sync.connectivity_poll_interval_secs = 1;
    config.sync.background_sync_delay_secs = 1;
    config
}

async fn mount_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

fn new_contact(name: &str) -> CrmAction {
    CrmAction::CreateContact(NewContact {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: None,
        organization_id: None,
    })
}

async fn wait_for_kind(
    rx: &mut broadcast::Receiver<StatusEvent>,
    kind: StatusKind,
) -> Option<StatusEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if event.kind == kind => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn queued_action_is_delivered_with_idempotency_key() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/actions/createContact"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let runtime = OfflineRuntime::builder(config_for(&server, &dir)).start().await.unwrap();
    assert!(runtime.service().is_online());
    assert!(runtime.is_watching_connectivity());

    let mut status = runtime.subscribe_status();
    let action = runtime.service().queue_crm_action(new_contact("Grace")).unwrap();

    let synced = wait_for_kind(&mut status, StatusKind::Synced).await;
    assert!(synced.is_some(), "expected a synced toast");
    assert_eq!(runtime.service().pending_action_count(), 0);
    assert!(runtime.service().last_sync_timestamp().is_some());

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("the action should have been posted");
    let key = post.headers.get("Idempotency-Key").unwrap().to_str().unwrap();
    assert_eq!(key, action.id);
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["name"], json!("Grace"));

    runtime.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn server_outage_is_retried_by_background_sync() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/actions/logActivity"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/actions/logActivity"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let runtime = OfflineRuntime::builder(config_for(&server, &dir)).start().await.unwrap();

    runtime
        .service()
        .queue_action("logActivity", json!({ "subjectId": "p-1", "kind": "call", "note": "x" }));

    let service = runtime.service().clone();
    let drained = poll_until(Duration::from_secs(5), Duration::from_millis(50), || {
        let service = service.clone();
        async move { service.pending_action_count() == 0 }
    })
    .await;
    assert!(drained, "background sync should have retried the action");

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 2);
    assert!(runtime.service().dead_letter_actions().is_empty());

    runtime.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_start_drains_once_health_recovers() {
    let server = MockServer::start().await;
    mount_health(&server, 503).await;

    let dir = TempDir::new().unwrap();
    let runtime = OfflineRuntime::builder(config_for(&server, &dir)).start().await.unwrap();
    assert!(!runtime.service().is_online());

    let mut status = runtime.subscribe_status();
    runtime.service().queue_crm_action(new_contact("Ada")).unwrap();
    assert!(wait_for_kind(&mut status, StatusKind::Queued).await.is_some());
    assert_eq!(runtime.service().pending_action_count(), 1);

    server.reset().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/actions/createContact"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    assert!(wait_for_kind(&mut status, StatusKind::WentOnline).await.is_some());
    let service = runtime.service().clone();
    let drained = poll_until(Duration::from_secs(5), Duration::from_millis(50), || {
        let service = service.clone();
        async move { service.pending_action_count() == 0 }
    })
    .await;
    assert!(drained);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_transport_is_a_config_error() {
    let mut config = OfflineConfig::default();
    config.storage.backend = StorageBackendKind::Memory;

    let result = OfflineRuntime::builder(config).start().await;
    assert!(matches!(result, Err(CareBridgeError::Config(_))));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_storage_opens() {
    let dir = TempDir::new().unwrap();
    let mut config = OfflineConfig::default();
    config.storage.path = dir.path().join("never-created");
    config.sync.max_attempts = 0;

    let result = OfflineRuntime::builder(config).start().await;
    assert!(matches!(result, Err(CareBridgeError::Config(_))));
    assert!(!dir.path().join("never-created").exists());
}
