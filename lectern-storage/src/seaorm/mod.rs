//! SeaORM implementation of the store interfaces

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabaseError};
pub use migrations::Migrator;
pub use repositories::{SeaOrmSecurityStore, DEFAULT_TENANT_TABLES};
