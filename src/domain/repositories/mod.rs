//! Storage trait definitions for the domain layer.
//!
//! These traits abstract the authoritative stores following the Repository
//! pattern. Concrete engines live in `crate::infrastructure::persistence` and
//! one is selected at startup by configuration.
//!
//! # Available Stores
//!
//! - [`LinkStore`] - Tinylink records, alias uniqueness, visit accounting
//! - [`TokenStore`] - Refresh credential state with compare-and-rotate
//!
//! # Testing
//!
//! Mock implementations are generated via `mockall` under `cfg(test)`.

pub mod link_store;
pub mod token_store;

pub use link_store::LinkStore;
pub use token_store::TokenStore;

#[cfg(test)]
pub use link_store::MockLinkStore;
#[cfg(test)]
pub use token_store::MockTokenStore;
