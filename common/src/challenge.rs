// common/src/challenge.rs
//! Client side of the sign-in exchange.
//!
//! The client picks (or receives) a nonce, asks the key holder to sign its
//! UTF-8 bytes, and sends `{publicKey, signature, nonce}` to the server.
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::messages::VerifyWalletRequest;
use crate::utils::generate_nonce;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyHolderError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("wallet has no public key")]
    MissingPublicKey,

    #[error("signing request rejected: {0}")]
    Rejected(String),
}

/// Holder of the private key, typically a wallet
pub trait KeyHolder {
    fn connected(&self) -> bool;

    fn public_key(&self) -> Option<[u8; 32]>;

    fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], KeyHolderError>;
}

/// Ed25519 key held in process memory
pub struct LocalKeyHolder {
    signing_key: SigningKey,
    connected: bool,
}

impl LocalKeyHolder {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            connected: true,
        }
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }
}

impl KeyHolder for LocalKeyHolder {
    fn connected(&self) -> bool {
        self.connected
    }

    fn public_key(&self) -> Option<[u8; 32]> {
        Some(self.signing_key.verifying_key().to_bytes())
    }

    fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], KeyHolderError> {
        if !self.connected {
            return Err(KeyHolderError::NotConnected);
        }
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

/// Fresh, unpredictable challenge for a sign-in attempt
pub fn compose_nonce() -> String {
    generate_nonce()
}

/// Have the key holder sign `nonce` and package the request body
pub fn compose_sign_in<K: KeyHolder + ?Sized>(
    holder: &K,
    nonce: &str,
) -> Result<VerifyWalletRequest, KeyHolderError> {
    if !holder.connected() {
        return Err(KeyHolderError::NotConnected);
    }
    let public_key = holder.public_key().ok_or(KeyHolderError::MissingPublicKey)?;
    let signature = holder.sign_message(nonce.as_bytes())?;

    Ok(VerifyWalletRequest {
        public_key: Some(public_key.to_vec()),
        signature: Some(signature.to_vec()),
        nonce: Some(nonce.to_string()),
    })
}
