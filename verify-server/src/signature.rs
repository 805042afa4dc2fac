// verify-server/src/signature.rs
//! Detached Ed25519 signature checks over the sign-in nonce.
use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureCheckError {
    #[error("public key must be 32 bytes, got {0}")]
    PublicKeyLength(usize),

    #[error("signature must be 64 bytes, got {0}")]
    SignatureLength(usize),

    /// Not distinguished further: bad curve point and bad proof look the same
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Verify `signature` over the UTF-8 bytes of `nonce`
pub fn verify_nonce_signature(
    public_key: &[u8],
    signature: &[u8],
    nonce: &str,
) -> Result<(), SignatureCheckError> {
    let public_key: &[u8; PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| SignatureCheckError::PublicKeyLength(public_key.len()))?;
    let signature: &[u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| SignatureCheckError::SignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| SignatureCheckError::VerificationFailed)?;

    verifying_key
        .verify_strict(nonce.as_bytes(), &Signature::from_bytes(signature))
        .map_err(|_| SignatureCheckError::VerificationFailed)
}
