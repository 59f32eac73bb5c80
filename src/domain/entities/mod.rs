//! Core domain entities.
//!
//! Entities are plain data structures without persistence concerns.
//!
//! # Entity Types
//!
//! - [`Identity`] - The user or guest a request acts as
//! - [`Tinylink`] - A short alias mapped to a target URL
//! - [`RefreshState`] - Server-side state of a refresh credential
//!
//! Creation and update inputs are separate structs (`NewTinylink`, `TinylinkPatch`).

pub mod identity;
pub mod link;
pub mod session;

pub use identity::Identity;
pub use link::{NewTinylink, Tinylink, TinylinkPatch};
pub use session::{RefreshCredential, RefreshState};
