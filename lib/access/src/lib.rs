//! Actor identity and role membership for folio.
//!
//! This crate provides:
//! - Role sets (`RoleSet`), the roles an actor holds
//! - The identity collaborator (`IdentityProvider`): actor -> roles
//! - The role directory collaborator (`RoleDirectory`): role -> members
//! - An in-memory implementation of both (`InMemoryDirectory`)
//!
//! # Example
//!
//! ```
//! use folio_access::RoleSet;
//! use folio_core::RoleCode;
//!
//! let roles = RoleSet::from_codes(["editor", "reviewer"]);
//! let allowed = RoleSet::from_codes(["reviewer", "administrator"]);
//!
//! assert!(roles.intersects(&allowed));
//! assert!(roles.contains(&RoleCode::new("editor")));
//! ```

pub mod directory;
pub mod error;
pub mod role;

pub use directory::{IdentityProvider, InMemoryDirectory, Member, RoleDirectory};
pub use error::AccessError;
pub use role::RoleSet;
