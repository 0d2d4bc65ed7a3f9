//! # Lectern Interfaces
//!
//! Collaborator interfaces consumed by the Lectern request-security pipeline.
//!
//! The pipeline never talks to a database or the system clock directly. It
//! depends on the traits defined here, which keeps every stage testable and
//! lets storage backends be swapped without touching the middleware.
//!
//! ## Main Interfaces
//!
//! - [`OrganizationStore`] - organization lookup by id
//! - [`OwnershipStore`] - owning organization of a tenant-scoped resource
//! - [`AuditStore`] - append-only audit trail
//! - [`Clock`] - source of the current time

pub mod clock;
pub mod database;
pub mod models;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::{AuditStore, OrganizationStore, OwnershipStore, StoreError, StoreResult};
pub use models::{AuditEntry, NewAuditEntry, Organization};
