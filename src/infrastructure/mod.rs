//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete storage and caching engines.
//!
//! # Modules
//!
//! - [`cache`] - Redirect cache and alias counter (Redis and in-process)
//! - [`persistence`] - Link and refresh token stores (PostgreSQL and in-process)

pub mod cache;
pub mod persistence;
