use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use lectern_interfaces::{AuditEntry, AuditStore, NewAuditEntry};
use lectern_logging::AUDIT_TARGET;
use std::sync::Arc;
use tracing::{info, warn};

use crate::extractors::Identity;
use crate::middleware::ClientInfo;

/// What an audited request did, captured before the handler runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub client: ClientInfo,
}

/// Whether requests with `method` change state and so get audited
pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Default audit action for a mutating method
pub fn action_for(method: &Method) -> &'static str {
    match *method {
        Method::POST => "create",
        Method::DELETE => "delete",
        _ => "update",
    }
}

/// First path segment after `/api/`, e.g. `students` for `/api/students/7`
pub fn entity_type_from_path(path: &str) -> Option<&str> {
    path.strip_prefix("/api/")
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
}

/// Appends audit entries for successful mutating requests.
///
/// Failures to write are logged and swallowed; they never change the
/// response the caller already has.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    enabled: bool,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record `event` if `status` is 2xx
    pub async fn record(
        &self,
        identity: &Identity,
        event: AuditEvent,
        status: StatusCode,
        now: DateTime<Utc>,
    ) -> Option<AuditEntry> {
        if !self.enabled || !status.is_success() {
            return None;
        }

        let entry = NewAuditEntry {
            organization_id: identity.organization_id.clone(),
            user_id: identity.subject_id.clone(),
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            ip_address: event.client.ip_address,
            user_agent: event.client.user_agent,
            timestamp: now,
        };

        match self.store.append_audit_entry(entry).await {
            Ok(stored) => {
                info!(
                    target: AUDIT_TARGET,
                    audit_id = %stored.id,
                    organization_id = %stored.organization_id,
                    user_id = %stored.user_id,
                    action = %stored.action,
                    entity_type = %stored.entity_type,
                    entity_id = stored.entity_id.as_deref().unwrap_or("-"),
                    "Audit entry recorded"
                );
                Some(stored)
            }
            Err(e) => {
                warn!(
                    organization_id = %identity.organization_id,
                    user_id = %identity.subject_id,
                    "Failed to record audit entry: {}", e
                );
                None
            }
        }
    }
}
