//! Persistence for the Lectern security pipeline
//!
//! The SeaORM backend serves production; [`testing::InMemorySecurityStore`]
//! stands in for it in tests and can simulate an unreachable store.

pub mod seaorm;
pub mod testing;

pub use seaorm::{DatabaseConnection, DatabaseError, Migrator, SeaOrmSecurityStore, DEFAULT_TENANT_TABLES};
pub use testing::InMemorySecurityStore;
