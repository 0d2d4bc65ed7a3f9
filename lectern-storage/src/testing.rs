//! In-memory store for tests and local development

use async_trait::async_trait;
use lectern_interfaces::{
    AuditEntry, AuditStore, NewAuditEntry, Organization, OrganizationStore, OwnershipStore, StoreError, StoreResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    organizations: HashMap<String, Organization>,
    // table -> resource id -> owning organization
    resources: HashMap<String, HashMap<String, String>>,
    missing_tables: HashSet<String>,
    audit_entries: Vec<AuditEntry>,
}

/// Thread-safe in-memory implementation of every store interface.
///
/// Tables know nothing about a schema: ownership lookups against a table with
/// no registered resources simply find nothing, unless the table was marked
/// missing with [`InMemorySecurityStore::drop_table`].
#[derive(Clone, Default)]
pub struct InMemorySecurityStore {
    inner: Arc<Mutex<Inner>>,
    unavailable: Arc<AtomicBool>,
    audit_failing: Arc<AtomicBool>,
}

impl InMemorySecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`Self::add_organization`]
    pub fn with_organization(self, organization: Organization) -> Self {
        self.add_organization(organization);
        self
    }

    pub fn add_organization(&self, organization: Organization) {
        self.lock().organizations.insert(organization.id.clone(), organization);
    }

    /// Register `resource_id` in `table` as owned by `organization_id`
    pub fn add_resource(&self, table: &str, resource_id: &str, organization_id: &str) {
        self.lock()
            .resources
            .entry(table.to_string())
            .or_default()
            .insert(resource_id.to_string(), organization_id.to_string());
    }

    /// Make every later lookup on `table` fail as if it was never created
    pub fn drop_table(&self, table: &str) {
        self.lock().missing_tables.insert(table.to_string());
    }

    /// Make organization and ownership lookups fail as unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make audit appends fail
    pub fn set_audit_failing(&self, failing: bool) {
        self.audit_failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every stored audit entry in insertion order
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.lock().audit_entries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(&self, table: &str) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store switched off"));
        }
        if self.lock().missing_tables.contains(table) {
            return Err(StoreError::missing_table(table));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for InMemorySecurityStore {
    async fn find_organization(&self, organization_id: &str) -> StoreResult<Option<Organization>> {
        self.check_reachable("organizations")?;
        Ok(self.lock().organizations.get(organization_id).cloned())
    }
}

#[async_trait]
impl OwnershipStore for InMemorySecurityStore {
    async fn resource_organization(&self, table: &str, resource_id: &str) -> StoreResult<Option<String>> {
        self.check_reachable(table)?;
        Ok(self
            .lock()
            .resources
            .get(table)
            .and_then(|rows| rows.get(resource_id))
            .cloned())
    }
}

#[async_trait]
impl AuditStore for InMemorySecurityStore {
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry> {
        if self.audit_failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("audit store switched off"));
        }
        let stored = entry.into_entry(uuid::Uuid::new_v4().to_string());
        self.lock().audit_entries.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_organization(&self, organization_id: &str, limit: u64) -> StoreResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .lock()
            .audit_entries
            .iter()
            .filter(|entry| entry.organization_id == organization_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }
}
