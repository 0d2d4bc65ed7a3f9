pub mod audit_logs;
pub mod organizations;

pub use audit_logs::Entity as AuditLogs;
pub use organizations::Entity as Organizations;
