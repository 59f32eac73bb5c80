//! Per-request identity resolution.
//!
//! Turns the credentials a request presents (bearer access credential, refresh
//! cookie, guest cookie) into the single [`Identity`] the request acts as.
//!
//! | Presented                          | State           | Outcome                     |
//! |------------------------------------|-----------------|-----------------------------|
//! | no bearer                          | Unauthenticated | guest (cookie or minted)    |
//! | bearer verifies                    | ValidAccess     | claims identity             |
//! | bearer expired, refresh rotates    | ExpiredAccess   | claims identity + new pair  |
//! | anything else                      | Rejected        | generic 401                 |

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::services::credential_signer::{CredentialError, CredentialSigner};
use crate::application::services::token_service::TokenService;
use crate::domain::entities::{Identity, RefreshCredential};
use crate::domain::repositories::TokenStore;
use crate::error::AppError;

/// Authentication state of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    ValidAccess,
    ExpiredAccess,
    Rejected,
}

/// Raw credentials read from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCredentials<'a> {
    pub bearer: Option<&'a str>,
    pub refresh: Option<&'a str>,
    pub guest: Option<&'a str>,
}

/// Result of resolving a request's credentials.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No bearer credential. `minted` is set when the guest cookie was absent
    /// or unusable and a new guest identity must be persisted.
    Guest { identity: Identity, minted: bool },

    /// A user (or guest holding an access credential) acting under `access`.
    /// `rotated` carries the replacement refresh credential after rotation.
    Authenticated {
        identity: Identity,
        access: String,
        rotated: Option<RefreshCredential>,
    },

    /// Credentials were presented and refused. `clear_refresh` is set when the
    /// refresh credential was found to be stale or replayed.
    Rejected { clear_refresh: bool },
}

impl Resolution {
    pub fn state(&self) -> AuthState {
        match self {
            Resolution::Guest { .. } => AuthState::Unauthenticated,
            Resolution::Authenticated { rotated: None, .. } => AuthState::ValidAccess,
            Resolution::Authenticated { rotated: Some(_), .. } => AuthState::ExpiredAccess,
            Resolution::Rejected { .. } => AuthState::Rejected,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Resolution::Guest { identity, .. } | Resolution::Authenticated { identity, .. } => {
                Some(identity)
            }
            Resolution::Rejected { .. } => None,
        }
    }
}

/// A freshly established access/refresh pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub access: String,
    pub refresh: RefreshCredential,
}

pub struct IdentityResolver<T: TokenStore + ?Sized> {
    signer: Arc<CredentialSigner>,
    tokens: Arc<TokenService<T>>,
}

impl<T: TokenStore + ?Sized> IdentityResolver<T> {
    pub fn new(signer: Arc<CredentialSigner>, tokens: Arc<TokenService<T>>) -> Self {
        Self { signer, tokens }
    }

    pub async fn resolve(&self, credentials: RequestCredentials<'_>) -> Resolution {
        self.resolve_at(credentials, Utc::now()).await
    }

    /// Resolves `credentials` using `now` for access credential expiry.
    pub async fn resolve_at(
        &self,
        credentials: RequestCredentials<'_>,
        now: DateTime<Utc>,
    ) -> Resolution {
        let Some(bearer) = credentials.bearer else {
            return Self::resolve_guest(credentials.guest);
        };

        match self.signer.verify_at(bearer, now) {
            Ok(claims) => match claims.identity() {
                Ok(identity) => {
                    tracing::debug!(identity = %identity, "Access credential accepted");
                    Resolution::Authenticated {
                        identity,
                        access: bearer.to_string(),
                        rotated: None,
                    }
                }
                Err(_) => Resolution::Rejected {
                    clear_refresh: false,
                },
            },
            Err(CredentialError::Expired(claims)) => match claims.identity() {
                Ok(identity) => self.rotate(identity, credentials.refresh).await,
                Err(_) => Resolution::Rejected {
                    clear_refresh: false,
                },
            },
            Err(e) => {
                tracing::info!(error = %e, "Access credential rejected");
                Resolution::Rejected {
                    clear_refresh: false,
                }
            }
        }
    }

    /// Guest identity from the cookie value, or a freshly minted one.
    pub fn resolve_guest(cookie: Option<&str>) -> Resolution {
        match cookie.and_then(Identity::guest_from_cookie) {
            Some(identity) => Resolution::Guest {
                identity,
                minted: false,
            },
            None => {
                let identity = Identity::new_guest();
                tracing::debug!(identity = %identity, "Minted guest identity");
                Resolution::Guest {
                    identity,
                    minted: true,
                }
            }
        }
    }

    async fn rotate(&self, owner: Identity, presented: Option<&str>) -> Resolution {
        let Some(presented) = presented else {
            tracing::info!(owner = %owner, "Expired access credential without refresh credential");
            metrics::counter!("tinylink_token_rotations_total", "outcome" => "missing").increment(1);
            return Resolution::Rejected {
                clear_refresh: false,
            };
        };

        match self.tokens.rotate(&owner, presented).await {
            Ok(refresh) => match self.signer.issue(&owner) {
                Ok(access) => {
                    tracing::debug!(owner = %owner, "Rotated credentials");
                    metrics::counter!("tinylink_token_rotations_total", "outcome" => "rotated")
                        .increment(1);
                    Resolution::Authenticated {
                        identity: owner,
                        access,
                        rotated: Some(refresh),
                    }
                }
                Err(e) => {
                    tracing::error!(owner = %owner, error = %e, "Failed to sign access credential");
                    metrics::counter!("tinylink_token_rotations_total", "outcome" => "error")
                        .increment(1);
                    Resolution::Rejected {
                        clear_refresh: false,
                    }
                }
            },
            Err(AppError::TokenNotValid { .. }) => {
                tracing::info!(owner = %owner, "Refresh credential mismatch, revoking");
                metrics::counter!("tinylink_token_rotations_total", "outcome" => "mismatch")
                    .increment(1);
                if let Err(e) = self.tokens.revoke(&owner).await {
                    tracing::warn!(owner = %owner, error = %e, "Failed to revoke refresh state");
                }
                Resolution::Rejected {
                    clear_refresh: true,
                }
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "Refresh rotation failed");
                metrics::counter!("tinylink_token_rotations_total", "outcome" => "error")
                    .increment(1);
                Resolution::Rejected {
                    clear_refresh: false,
                }
            }
        }
    }

    /// Issues an access/refresh pair for `identity`. Called by the login glue
    /// once an external identity provider has vouched for the user.
    pub async fn establish_session(&self, identity: Identity) -> Result<Session, AppError> {
        let refresh = self.tokens.issue(&identity).await?;
        let access = self.signer.issue(&identity).map_err(|e| {
            AppError::internal(
                "Failed to sign access credential",
                serde_json::json!({ "reason": e.to_string() }),
            )
        })?;

        Ok(Session {
            identity,
            access,
            refresh,
        })
    }

    /// Revokes the identity's refresh state.
    pub async fn logout(&self, identity: &Identity) -> Result<(), AppError> {
        self.tokens.revoke(identity).await
    }
}
