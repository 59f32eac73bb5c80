//! Storage engine implementations.
//!
//! One implementation per engine for each domain store trait, selected at
//! startup by `STORAGE_BACKEND`.
//!
//! # Stores
//!
//! - [`PgLinkStore`] / [`PgTokenStore`] - PostgreSQL via SQLx
//! - [`MemoryLinkStore`] / [`MemoryTokenStore`] - process memory

pub mod memory_link_store;
pub mod memory_token_store;
pub mod pg_link_store;
pub mod pg_token_store;

pub use memory_link_store::MemoryLinkStore;
pub use memory_token_store::MemoryTokenStore;
pub use pg_link_store::PgLinkStore;
pub use pg_token_store::PgTokenStore;
