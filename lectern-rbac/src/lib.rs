//! Role-based access control for Lectern
//!
//! Roles form a single total order: `readonly < teacher < admin < owner`.
//! A caller holding role `A` may use any route whose minimum role `B`
//! satisfies `rank(A) >= rank(B)`.

pub mod error;
pub mod roles;

pub use error::{RbacError, RbacResult};
pub use roles::{has_permission, Role};
