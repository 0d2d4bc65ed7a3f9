//! Per-route security requirements

use axum::http::Method;
use lectern_rbac::Role;
use std::collections::HashMap;

/// Ownership requirement of a route parameterized by a resource id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRule {
    /// Tenant table holding the resource
    pub table: String,
    /// Route parameter carrying the resource id
    pub param: String,
}

/// What a route demands beyond authentication and scoping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub min_role: Option<Role>,
    pub ownership: Option<OwnershipRule>,
    pub audit_action: Option<String>,
    pub audit_entity_type: Option<String>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_role(mut self, role: Role) -> Self {
        self.min_role = Some(role);
        self
    }

    /// The `id` parameter names a row of `table`
    pub fn owned_by(self, table: impl Into<String>) -> Self {
        self.owned_by_param(table, "id")
    }

    pub fn owned_by_param(mut self, table: impl Into<String>, param: impl Into<String>) -> Self {
        self.ownership = Some(OwnershipRule {
            table: table.into(),
            param: param.into(),
        });
        self
    }

    pub fn audit_action(mut self, action: impl Into<String>) -> Self {
        self.audit_action = Some(action.into());
        self
    }

    pub fn audit_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.audit_entity_type = Some(entity_type.into());
        self
    }
}

/// Route policies keyed by method and matched route pattern
/// (`/api/students/{id}`, not the concrete path)
#[derive(Debug, Clone, Default)]
pub struct RoutePolicies {
    routes: HashMap<(Method, String), RoutePolicy>,
}

impl RoutePolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, pattern: impl Into<String>, policy: RoutePolicy) -> Self {
        self.insert(method, pattern, policy);
        self
    }

    pub fn insert(&mut self, method: Method, pattern: impl Into<String>, policy: RoutePolicy) {
        self.routes.insert((method, pattern.into()), policy);
    }

    pub fn get(&self, method: &Method, pattern: &str) -> Option<&RoutePolicy> {
        self.routes.get(&(method.clone(), pattern.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
