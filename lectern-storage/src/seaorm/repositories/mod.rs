pub mod security_store;

pub use security_store::{SeaOrmSecurityStore, DEFAULT_TENANT_TABLES};
