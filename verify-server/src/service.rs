// verify-server/src/service.rs
use actix::Addr;
use chrono::{DateTime, Utc};
use common::address::address_from_public_key;
use common::credential::CredentialIssuer;
use common::messages::SignInPayload;

use crate::challenge_registry::{
    ChallengeRegistryActor, ChallengeResult, ConsumeChallenge, IssueChallenge, IssuedChallenge,
};
use crate::error::VerifyError;
use crate::identity_resolver::IdentityResolver;
use crate::signature::{verify_nonce_signature, SignatureCheckError};

/// Credential handed back to a client after a successful sign-in
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub user_id: String,
    pub address: String,
    pub expires_at: DateTime<Utc>,
}

/// Wallet sign-in: signature check, identity resolution, credential issuance
///
/// Holds no per-request state; clones share the store handle and, when
/// replay protection is on, the challenge registry.
#[derive(Clone)]
pub struct WalletVerifier {
    resolver: IdentityResolver,
    issuer: CredentialIssuer,
    challenges: Option<Addr<ChallengeRegistryActor>>,
}

impl WalletVerifier {
    pub fn new(resolver: IdentityResolver, issuer: CredentialIssuer) -> Self {
        Self {
            resolver,
            issuer,
            challenges: None,
        }
    }

    /// Only accept nonces issued by `registry`
    pub fn with_challenges(mut self, registry: Addr<ChallengeRegistryActor>) -> Self {
        self.challenges = Some(registry);
        self
    }

    pub fn enforces_challenges(&self) -> bool {
        self.challenges.is_some()
    }

    pub async fn issue_challenge(&self) -> Option<IssuedChallenge> {
        let registry = self.challenges.as_ref()?;
        match registry.send(IssueChallenge).await {
            Ok(challenge) => Some(challenge),
            Err(e) => {
                tracing::error!("Challenge registry unavailable: {}", e);
                None
            }
        }
    }

    pub async fn verify(&self, payload: SignInPayload) -> Result<IssuedCredential, VerifyError> {
        verify_nonce_signature(&payload.public_key, &payload.signature, &payload.nonce).map_err(
            |e| match e {
                SignatureCheckError::VerificationFailed => {
                    tracing::warn!("Signature verification failed");
                    VerifyError::Unauthorized
                }
                malformed => VerifyError::BadRequest(malformed.to_string()),
            },
        )?;

        // Consumed only after the proof checks out, so forged requests
        // cannot burn a client's nonce
        self.consume_challenge(&payload.nonce).await?;

        let address = address_from_public_key(&payload.public_key);
        let identity = self
            .resolver
            .resolve_or_create(&address)
            .await
            .map_err(|e| {
                tracing::error!("Identity resolution failed for {}: {}", address, e);
                VerifyError::IdentityResolutionFailed(e)
            })?;

        let user_id = identity.id.to_string();
        let signed = self.issuer.issue(&user_id).map_err(|e| {
            tracing::error!("Credential issuance failed for {}: {}", user_id, e);
            VerifyError::IssuanceFailed(e)
        })?;

        tracing::info!("Issued credential for {} ({})", user_id, address);
        Ok(IssuedCredential {
            token: signed.token,
            user_id,
            address,
            expires_at: signed.claims.expires_at(),
        })
    }

    async fn consume_challenge(&self, nonce: &str) -> Result<(), VerifyError> {
        let Some(registry) = &self.challenges else {
            return Ok(());
        };

        let result = registry
            .send(ConsumeChallenge {
                nonce: nonce.to_string(),
            })
            .await
            .map_err(|e| {
                tracing::error!("Challenge registry unavailable: {}", e);
                VerifyError::ChallengeRejected
            })?;

        match result {
            ChallengeResult::Consumed => Ok(()),
            rejected => {
                tracing::warn!("Challenge rejected: {:?}", rejected);
                Err(VerifyError::ChallengeRejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IdentityStore, MemoryIdentityStore};
    use actix::Actor;
    use common::address::encode;
    use common::challenge::{compose_sign_in, KeyHolder, LocalKeyHolder};
    use common::credential::CredentialValidator;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &[u8] = b"service-test-secret";

    fn verifier(store: &MemoryIdentityStore) -> WalletVerifier {
        let resolver = IdentityResolver::new(Arc::new(store.clone()), Duration::from_secs(5));
        WalletVerifier::new(resolver, CredentialIssuer::new(SECRET, 86_400).unwrap())
    }

    fn rfc8032_holder() -> LocalKeyHolder {
        let seed: [u8; 32] = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec,
            0x2c, 0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03,
            0x1c, 0xae, 0x7f, 0x60,
        ];
        LocalKeyHolder::from_seed(&seed)
    }

    fn payload(holder: &LocalKeyHolder, nonce: &str) -> SignInPayload {
        compose_sign_in(holder, nonce).unwrap().into_payload().unwrap()
    }

    #[actix_web::test]
    async fn test_sign_in_binds_token_to_identity() {
        let store = MemoryIdentityStore::new();
        let holder = rfc8032_holder();

        let credential = verifier(&store)
            .verify(payload(&holder, "abc123"))
            .await
            .unwrap();

        let address = encode(&holder.public_key().unwrap());
        let identity = store.find_by_address(&address).await.unwrap().unwrap();
        assert_eq!(credential.user_id, identity.id.to_string());
        assert_eq!(credential.address, address);

        let claims = CredentialValidator::new(SECRET)
            .unwrap()
            .validate(&credential.token)
            .unwrap();
        assert_eq!(claims.sub, identity.id.to_string());
    }

    #[actix_web::test]
    async fn test_repeat_sign_ins_keep_user_id() {
        let store = MemoryIdentityStore::new();
        let verifier = verifier(&store);
        let holder = LocalKeyHolder::generate();

        let first = verifier.verify(payload(&holder, "nonce-1")).await.unwrap();
        let second = verifier.verify(payload(&holder, "nonce-2")).await.unwrap();
        let replayed = verifier.verify(payload(&holder, "nonce-1")).await.unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.user_id, replayed.user_id);
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn test_forged_signature_creates_nothing() {
        let store = MemoryIdentityStore::new();
        let holder = LocalKeyHolder::generate();
        let mut forged = payload(&holder, "abc123");
        forged.nonce = "abc124".into();

        let result = verifier(&store).verify(forged).await;
        assert!(matches!(result, Err(VerifyError::Unauthorized)));
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn test_wrong_key_length_is_bad_request() {
        let store = MemoryIdentityStore::new();
        let holder = LocalKeyHolder::generate();
        let mut malformed = payload(&holder, "abc123");
        malformed.public_key.truncate(31);

        let result = verifier(&store).verify(malformed).await;
        assert!(matches!(result, Err(VerifyError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn test_enforced_challenges_are_single_use() {
        let store = MemoryIdentityStore::new();
        let registry = ChallengeRegistryActor::new().start();
        let verifier = verifier(&store).with_challenges(registry);
        let holder = LocalKeyHolder::generate();

        // Client-composed nonces are refused
        let result = verifier.verify(payload(&holder, "abc123")).await;
        assert!(matches!(result, Err(VerifyError::ChallengeRejected)));

        let challenge = verifier.issue_challenge().await.unwrap();
        let signed = payload(&holder, &challenge.nonce);
        assert!(verifier.verify(signed.clone()).await.is_ok());

        let replay = verifier.verify(signed).await;
        assert!(matches!(replay, Err(VerifyError::ChallengeRejected)));
    }

    #[actix_web::test]
    async fn test_forged_request_does_not_burn_challenge() {
        let store = MemoryIdentityStore::new();
        let registry = ChallengeRegistryActor::new().start();
        let verifier = verifier(&store).with_challenges(registry);
        let holder = LocalKeyHolder::generate();
        let attacker = LocalKeyHolder::generate();

        let challenge = verifier.issue_challenge().await.unwrap();
        let mut forged = payload(&attacker, &challenge.nonce);
        forged.public_key = holder.public_key().unwrap().to_vec();
        assert!(matches!(
            verifier.verify(forged).await,
            Err(VerifyError::Unauthorized)
        ));

        assert!(verifier
            .verify(payload(&holder, &challenge.nonce))
            .await
            .is_ok());
    }
}
