//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod links;
pub mod redirect;
pub mod session;

pub use health::health_handler;
pub use links::{create_link_handler, delete_alias_handler, list_links_handler, update_link_handler};
pub use redirect::{private_redirect_handler, public_redirect_handler};
pub use session::logout_handler;
