//! SeaORM-backed organization, ownership and audit store

use async_trait::async_trait;
use lectern_interfaces::{
    AuditEntry, AuditStore, NewAuditEntry, Organization, OrganizationStore, OwnershipStore, StoreError, StoreResult,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, Value,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::seaorm::entities::{audit_logs, organizations, AuditLogs, Organizations};

/// Tables whose rows carry an `organization_id` column
pub const DEFAULT_TENANT_TABLES: &[&str] = &["students", "classes", "books", "reading_sessions", "users"];

/// Store implementation over a SeaORM connection
#[derive(Clone)]
pub struct SeaOrmSecurityStore {
    db: DatabaseConnection,
    tenant_tables: Arc<HashSet<String>>,
}

impl SeaOrmSecurityStore {
    /// Create a store that may check ownership on [`DEFAULT_TENANT_TABLES`]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_tenant_tables(db, DEFAULT_TENANT_TABLES.iter().copied())
    }

    /// Create a store with an explicit set of tenant tables
    pub fn with_tenant_tables<I, S>(db: DatabaseConnection, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            db,
            tenant_tables: Arc::new(tables.into_iter().map(Into::into).collect()),
        }
    }

    /// Insert or replace an organization
    pub async fn save_organization(&self, organization: &Organization) -> StoreResult<()> {
        let model = organizations::ActiveModel {
            id: Set(organization.id.clone()),
            name: Set(organization.name.clone()),
            is_active: Set(organization.is_active),
            created_at: Set(chrono::Utc::now()),
        };

        let exists = Organizations::find_by_id(organization.id.clone())
            .one(&self.db)
            .await
            .map_err(|e| classify_db_error("organizations", e))?
            .is_some();

        let saved = if exists {
            let mut model = model;
            model.created_at = sea_orm::ActiveValue::NotSet;
            model.update(&self.db).await
        } else {
            model.insert(&self.db).await
        };
        saved.map_err(|e| classify_db_error("organizations", e))?;

        Ok(())
    }

    fn check_table(&self, table: &str) -> StoreResult<()> {
        if !is_plain_identifier(table) {
            return Err(StoreError::invalid_query(format!("Illegal table name: {}", table)));
        }
        if !self.tenant_tables.contains(table) {
            return Err(StoreError::invalid_query(format!("Table is not tenant scoped: {}", table)));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for SeaOrmSecurityStore {
    async fn find_organization(&self, organization_id: &str) -> StoreResult<Option<Organization>> {
        let found = Organizations::find_by_id(organization_id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| classify_db_error("organizations", e))?;

        Ok(found.map(Organization::from))
    }
}

#[async_trait]
impl OwnershipStore for SeaOrmSecurityStore {
    async fn resource_organization(&self, table: &str, resource_id: &str) -> StoreResult<Option<String>> {
        self.check_table(table)?;

        let backend = self.db.get_database_backend();
        let placeholder = match backend {
            DatabaseBackend::Postgres => "$1",
            _ => "?",
        };
        // The table name is allow-listed above; only the id is user input
        let sql = format!("SELECT organization_id FROM {} WHERE id = {}", table, placeholder);
        let statement = Statement::from_sql_and_values(backend, sql, [Value::from(resource_id)]);

        let row = self
            .db
            .query_one(statement)
            .await
            .map_err(|e| classify_db_error(table, e))?;

        match row {
            // A row without an owner belongs to nobody and so to no caller
            Some(row) => {
                let owner: Option<String> = row
                    .try_get("", "organization_id")
                    .map_err(|e| classify_db_error(table, e))?;
                Ok(Some(owner.unwrap_or_default()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuditStore for SeaOrmSecurityStore {
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry> {
        let model = audit_logs::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            organization_id: Set(entry.organization_id),
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            created_at: Set(entry.timestamp),
        };

        let saved = model
            .insert(&self.db)
            .await
            .map_err(|e| classify_db_error("audit_logs", e))?;

        debug!("Stored audit entry {}", saved.id);
        Ok(saved.into())
    }

    async fn list_for_organization(&self, organization_id: &str, limit: u64) -> StoreResult<Vec<AuditEntry>> {
        let rows = AuditLogs::find()
            .filter(audit_logs::Column::OrganizationId.eq(organization_id))
            .order_by_desc(audit_logs::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| classify_db_error("audit_logs", e))?;

        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}

/// Lowercase ASCII identifier: `[a-z_][a-z0-9_]*`
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn classify_db_error(table: &str, error: DbErr) -> StoreError {
    let message = error.to_string();
    let postgres_missing = message.contains("relation") && message.contains("does not exist");
    if message.contains("no such table") || postgres_missing {
        return StoreError::missing_table(table);
    }
    match error {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::unavailable(message),
        _ => StoreError::internal(message),
    }
}
