pub mod context;

pub use context::{Identity, OrganizationContext};
