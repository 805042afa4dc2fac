// common/src/credential.rs
//! Bearer credentials issued after a successful wallet sign-in.
//!
//! A credential is an HS256 JWT binding the identity id as both `sub` and
//! `userId`. It expires a fixed window after issuance and is never revoked;
//! expiry is the only termination mechanism.
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default credential lifetime in seconds (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Upper bound for any configured lifetime in seconds (one year)
pub const MAX_TTL_SECS: i64 = 365 * 86_400;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("credential lifetime must be between 1 and 31536000 seconds, got {0}")]
    InvalidTtl(i64),

    #[error("failed to sign credential: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid credential: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("credential expired")]
    Expired,
}

/// JWT claims carried by every issued credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

impl CredentialClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// Compact token plus the claims it was signed over
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: CredentialClaims,
}

/// Mints credentials with a server-held symmetric secret
#[derive(Clone)]
pub struct CredentialIssuer {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Result<Self, CredentialError> {
        if secret.is_empty() {
            return Err(CredentialError::EmptySecret);
        }
        if !(1..=MAX_TTL_SECS).contains(&ttl_secs) {
            return Err(CredentialError::InvalidTtl(ttl_secs));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn issue(&self, identity_id: &str) -> Result<SignedToken, CredentialError> {
        self.issue_at(identity_id, Utc::now())
    }

    /// Issue a credential as if the current time were `now`
    pub fn issue_at(
        &self,
        identity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedToken, CredentialError> {
        let claims = CredentialClaims {
            sub: identity_id.to_string(),
            user_id: identity_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(CredentialError::Signing)?;

        Ok(SignedToken { token, claims })
    }
}

/// Checks signature and expiry of presented credentials
#[derive(Clone)]
pub struct CredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialValidator {
    pub fn new(secret: &[u8]) -> Result<Self, CredentialError> {
        if secret.is_empty() {
            return Err(CredentialError::EmptySecret);
        }

        // Expiry is checked against an explicit clock in `validate_at`
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn validate(&self, token: &str) -> Result<CredentialClaims, CredentialError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CredentialClaims, CredentialError> {
        let data = decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
            .map_err(CredentialError::Invalid)?;

        if now.timestamp() >= data.claims.exp {
            return Err(CredentialError::Expired);
        }

        Ok(data.claims)
    }
}
