//! Signing and verification of access credentials.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Identity;

/// Claims carried by an access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Textual identity (`user:<id>` or `guest:<uuid>`).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    /// Parses the subject back into an [`Identity`].
    pub fn identity(&self) -> Result<Identity, CredentialError> {
        self.sub.parse().map_err(|_| CredentialError::Malformed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("access credential is malformed")]
    Malformed,

    #[error("access credential signature does not verify")]
    BadSignature,

    /// Signature is valid but the credential is past `exp`. The claims are kept
    /// so the caller can rotate on behalf of the same owner.
    #[error("access credential has expired")]
    Expired(AccessClaims),

    #[error("failed to sign access credential: {0}")]
    Encoding(String),
}

/// HS256 signer for access credentials.
///
/// Immutable after construction and shared behind an `Arc`. Expiry is checked
/// here rather than by `jsonwebtoken` so that `now >= exp` is exact and the
/// clock can be injected in tests.
pub struct CredentialSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
}

impl CredentialSigner {
    pub fn new(secret: &[u8], issuer: impl Into<String>, access_ttl: Duration) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
            access_ttl,
        }
    }

    pub fn sign(&self, claims: &AccessClaims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CredentialError::Encoding(e.to_string()))
    }

    /// Issues a fresh access credential for `identity`.
    pub fn issue(&self, identity: &Identity) -> Result<String, CredentialError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let claims = AccessClaims {
            sub: identity.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            iss: self.issuer.clone(),
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, CredentialError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies signature, issuer and subject, then expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, CredentialError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => CredentialError::BadSignature,
                _ => CredentialError::Malformed,
            },
        )?;

        let claims = data.claims;
        claims.identity()?;

        if now.timestamp() >= claims.exp {
            return Err(CredentialError::Expired(claims));
        }

        Ok(claims)
    }
}
