//! Resource ownership verification

use lectern_config::ScopeEnforcement;
use lectern_interfaces::OwnershipStore;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::{WebError, WebResult};

/// Result of checking one resource against the caller's organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipCheck {
    Owned,
    /// No such resource
    Absent,
    /// The resource belongs to another organization
    Foreign,
    /// The store could not answer and enforcement is permissive
    Unchecked,
}

/// Confirms a requested resource belongs to the caller's organization
#[derive(Clone)]
pub struct OwnershipGuard {
    store: Arc<dyn OwnershipStore>,
    enforcement: ScopeEnforcement,
}

impl OwnershipGuard {
    pub fn new(store: Arc<dyn OwnershipStore>, enforcement: ScopeEnforcement) -> Self {
        Self { store, enforcement }
    }

    pub async fn check(&self, table: &str, resource_id: &str, organization_id: &str) -> WebResult<OwnershipCheck> {
        match self.store.resource_organization(table, resource_id).await {
            Ok(Some(owner)) if owner == organization_id => Ok(OwnershipCheck::Owned),
            Ok(Some(_)) => Ok(OwnershipCheck::Foreign),
            Ok(None) => Ok(OwnershipCheck::Absent),
            Err(e) if e.is_unanswered() => match self.enforcement {
                ScopeEnforcement::Permissive => {
                    warn!(table, resource_id, "Ownership check skipped: {}", e);
                    Ok(OwnershipCheck::Unchecked)
                }
                ScopeEnforcement::Strict => {
                    warn!(table, resource_id, "Ownership check failed under strict scoping: {}", e);
                    Err(WebError::service_unavailable("Ownership check unavailable"))
                }
            },
            Err(e) => {
                error!(table, "Ownership check rejected: {}", e);
                Err(WebError::internal(e.to_string()))
            }
        }
    }

    /// Check and reject anything not owned by `organization_id`.
    /// Absent resources answer 404, foreign ones 403.
    pub async fn enforce(&self, table: &str, resource_id: &str, organization_id: &str) -> WebResult<OwnershipCheck> {
        let outcome = self.check(table, resource_id, organization_id).await?;
        match outcome {
            OwnershipCheck::Owned | OwnershipCheck::Unchecked => {
                debug!(table, resource_id, ?outcome, "Ownership verified");
                Ok(outcome)
            }
            OwnershipCheck::Absent => Err(WebError::not_found(format!("{} not found", entity_label(table)))),
            OwnershipCheck::Foreign => {
                warn!(table, resource_id, organization_id, "Cross-organization access denied");
                Err(WebError::forbidden("Access denied"))
            }
        }
    }
}

/// `reading_sessions` -> `Reading session`
pub fn entity_label(table: &str) -> String {
    let singular = if let Some(stem) = table.strip_suffix("sses") {
        format!("{}ss", stem)
    } else {
        table.strip_suffix('s').unwrap_or(table).to_string()
    };
    let spaced = singular.replace('_', " ");

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Resource".to_string(),
    }
}
