// common/src/messages.rs
// Wire types shared by the verify-server and its clients.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of `POST /verify-wallet`
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a typed rejection instead of a generic parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyWalletRequest {
    pub public_key: Option<Vec<u8>>,
    pub signature: Option<Vec<u8>>,
    pub nonce: Option<String>,
}

/// A sign-in attempt with every required field present and non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInPayload {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub nonce: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing publicKey, signature, or nonce")]
    MissingFields,
}

impl VerifyWalletRequest {
    pub fn into_payload(self) -> Result<SignInPayload, RequestError> {
        match (self.public_key, self.signature, self.nonce) {
            (Some(public_key), Some(signature), Some(nonce))
                if !public_key.is_empty() && !signature.is_empty() && !nonce.is_empty() =>
            {
                Ok(SignInPayload {
                    public_key,
                    signature,
                    nonce,
                })
            }
            _ => Err(RequestError::MissingFields),
        }
    }
}

/// Successful sign-in response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyWalletResponse {
    pub token: String,
    pub user_id: String,
}

/// Server-issued challenge for clients that sign a server nonce
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of presenting a bearer credential to `GET /session`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Uniform error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
