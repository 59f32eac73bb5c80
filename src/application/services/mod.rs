//! Business logic services for the application layer.

pub mod credential_signer;
pub mod identity_resolver;
pub mod link_service;
pub mod token_service;

pub use credential_signer::{AccessClaims, CredentialError, CredentialSigner};
pub use identity_resolver::{AuthState, IdentityResolver, RequestCredentials, Resolution, Session};
pub use link_service::{
    LinkHealth, LinkService, LinkSettings, NewLinkRequest, RedirectRoute, RedirectTarget,
};
pub use token_service::TokenService;
