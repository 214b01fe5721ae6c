//! Example: Queueing CRM work through a connectivity outage
//!
//! Runs the offline engine on in-memory storage with an executor that only
//! logs what it would send. The connectivity signal is driven by hand to show
//! the queue filling while offline and draining on reconnect.
//!
//! Run with: `cargo run -p carebridge-infra --example offline_demo`

use std::sync::Arc;

use async_trait::async_trait;
use carebridge_core::{ExecutionError, ExecutionSink};
use carebridge_domain::{
    ActivityLog, CrmAction, OfflineConfig, PendingAction, StorageBackendKind,
};
use carebridge_infra::{observability, OfflineRuntime};
use serde_json::json;
use tracing::info;

/// Executor that logs each action instead of calling a CRM
struct ConsoleExecutionSink;

#[async_trait]
impl ExecutionSink for ConsoleExecutionSink {
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError> {
        info!(
            id = %action.id,
            action_type = %action.action_type,
            retry_count = action.retry_count,
            payload = %action.payload,
            "would send action"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = OfflineConfig::default();
    config.storage.backend = StorageBackendKind::Memory;
    config.logging.filter = "carebridge=debug,info".to_string();
    observability::init(&config.logging);

    let runtime =
        OfflineRuntime::builder(config).executor(Arc::new(ConsoleExecutionSink)).start().await?;
    let service = runtime.service().clone();

    let mut status = runtime.subscribe_status();
    let toasts = tokio::spawn(async move {
        while let Ok(event) = status.recv().await {
            info!(kind = %event.kind, title = %event.title, "{}", event.description);
        }
    });

    service.store_offline_data("patients", json!([{ "id": "p-17", "name": "Ada Lovelace" }]));

    service.set_online(false).await;
    service.queue_crm_action(CrmAction::LogActivity(ActivityLog {
        subject_id: "p-17".to_string(),
        kind: "call".to_string(),
        note: "Confirmed follow-up visit".to_string(),
    }))?;
    service.queue_action("sendEmail", json!({
        "to": "ada@example.com",
        "subject": "Visit reminder",
        "body": "See you on Tuesday."
    }));
    info!(pending = service.pending_action_count(), "queued while offline");

    service.set_online(true).await;
    info!(
        pending = service.pending_action_count(),
        last_sync = ?service.last_sync_timestamp(),
        "reconnected"
    );

    runtime.shutdown().await?;
    toasts.abort();
    Ok(())
}
