//! Store interfaces
//!
//! These traits describe the narrow slice of persistence the security
//! pipeline needs. Implementations live in `lectern-storage`.

use async_trait::async_trait;

use crate::models::{AuditEntry, NewAuditEntry, Organization};

/// Errors reported by store implementations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing table does not exist yet (schema not migrated)
    #[error("Table not found: {table}")]
    MissingTable { table: String },

    /// The store could not be reached or did not answer
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// The caller asked for something the store refuses to query
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Any other store failure
    #[error("Internal store error: {message}")]
    Internal { message: String },
}

impl StoreError {
    pub fn missing_table(table: impl Into<String>) -> Self {
        Self::MissingTable { table: table.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the store failed to answer, as opposed to rejecting the
    /// question itself. Only unanswered lookups are eligible for fail-open.
    pub fn is_unanswered(&self) -> bool {
        !matches!(self, Self::InvalidQuery { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Organization lookup
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Find an organization by its id
    async fn find_organization(&self, organization_id: &str) -> StoreResult<Option<Organization>>;
}

/// Resource ownership lookup
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    /// Return the owning organization id of `resource_id` in `table`, or
    /// `None` when no such row exists
    async fn resource_organization(&self, table: &str, resource_id: &str) -> StoreResult<Option<String>>;
}

/// Append-only audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a new audit entry. Entries are never updated or deleted.
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry>;

    /// List the entries of one organization, newest first
    async fn list_for_organization(&self, organization_id: &str, limit: u64) -> StoreResult<Vec<AuditEntry>>;
}
