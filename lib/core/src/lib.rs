//! Core identifiers and utilities for the folio publication engine.
//!
//! This crate provides the strongly-typed keys shared by every other crate
//! in the workspace (content types, content ids, workflow states, role codes,
//! user ids), the reference to a piece of content, and the `Result` alias.

pub mod content;
pub mod error;
pub mod id;

pub use content::ContentRef;
pub use error::Result;
pub use id::{ContentId, ContentType, ParseIdError, RoleCode, StateId, TransitionRecordId, UserId};
