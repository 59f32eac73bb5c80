//! HTTP layer: translates requests into service calls and formats responses.
//!
//! # Modules
//!
//! - [`dto`] - Request/response bodies and their validation
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Identity resolution, rate limiting and tracing
//! - [`routes`] - Identity-scoped route composition

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
