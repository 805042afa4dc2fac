// common/src/models/identity.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Domain used for the placeholder contact address of wallet identities
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "example.com";

/// Durable principal record keyed by wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-assigned identifier, immutable once created
    pub id: Uuid,
    /// Base58 form of the holder's public key; unique across identities
    pub public_key_address: String,
    /// Deterministic placeholder contact string derived from the address
    pub email: String,
    /// Profile attributes owned by the profile flow
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a first-time wallet identity
#[derive(Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub public_key_address: String,
    pub email: String,
    /// Unused by the application but must be non-guessable
    pub password: String,
    pub metadata: Map<String, Value>,
}

impl NewIdentity {
    /// Build the record for an address seen for the first time
    pub fn for_address(address: &str, password: String) -> Self {
        let mut metadata = Map::new();
        metadata.insert("wallet".to_string(), Value::String(address.to_string()));

        Self {
            public_key_address: address.to_string(),
            email: placeholder_email(address),
            password,
            metadata,
        }
    }

    /// Materialize the record with a freshly assigned id
    pub fn into_identity(self) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            public_key_address: self.public_key_address,
            email: self.email,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

// Keeps the placeholder secret out of logs
impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("public_key_address", &self.public_key_address)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Placeholder contact string for an address
pub fn placeholder_email(address: &str) -> String {
    format!("{}@{}", address, PLACEHOLDER_EMAIL_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_for_address() {
        let record = NewIdentity::for_address("4Nd1mY", "secret".to_string());
        assert_eq!(record.email, "4Nd1mY@example.com");
        assert_eq!(record.metadata.get("wallet"), Some(&Value::String("4Nd1mY".into())));
    }

    #[test]
    fn test_debug_redacts_password() {
        let record = NewIdentity::for_address("4Nd1mY", "hunter2hunter2".to_string());
        let rendered = format!("{:?}", record);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_into_identity_keeps_address() {
        let identity = NewIdentity::for_address("4Nd1mY", "x".to_string()).into_identity();
        assert_eq!(identity.public_key_address, "4Nd1mY");
        assert_eq!(identity.email, placeholder_email("4Nd1mY"));
    }
}
