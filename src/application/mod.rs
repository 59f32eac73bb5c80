//! Application layer services implementing business logic.
//!
//! Services consume the domain store traits and take the acting [`Identity`]
//! as an explicit argument. HTTP handlers and the admin CLI call into them.
//!
//! # Available Services
//!
//! - [`services::credential_signer::CredentialSigner`] - Access credential signing and verification
//! - [`services::token_service::TokenService`] - Refresh credential issue, rotation and revocation
//! - [`services::identity_resolver::IdentityResolver`] - Per-request identity state machine
//! - [`services::link_service::LinkService`] - Link lifecycle and redirect resolution
//!
//! [`Identity`]: crate::domain::entities::Identity

pub mod services;
