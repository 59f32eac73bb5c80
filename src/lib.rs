//! # tinylink
//!
//! A URL shortener with user-owned and guest-owned links, private aliases,
//! rotating sessions and cached redirects, built with Axum.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Entities, store traits and the visit worker
//! - **Application Layer** ([`application`]) - Link, credential and identity services
//! - **Infrastructure Layer** ([`infrastructure`]) - PostgreSQL, Redis and in-memory engines
//! - **API Layer** ([`api`]) - Handlers, DTOs and middleware
//!
//! ## Features
//!
//! - Public aliases and per-user private aliases (`/p/{alias}`)
//! - Anonymous guest identities persisted in a cookie
//! - Short-lived signed access credentials with single-use rotating refresh
//!   credentials
//! - Cache-aside redirects with owner-scoped lifetimes
//! - Best-effort visit counting off the redirect path
//!
//! ## Quick Start
//!
//! ```bash
//! export TOKEN_SIGNING_SECRET="$(openssl rand -hex 32)"
//! export STORAGE_BACKEND=memory   # or DATABASE_URL=postgres://...
//! cargo run
//! ```
//!
//! Configuration is read from environment variables, see [`config::Config`].

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{IdentityResolver, LinkService, TokenService};
    pub use crate::domain::entities::{Identity, Tinylink};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
