// verify-server/src/store/mod.rs
//! Access to the external identity store.
//!
//! The store owns the uniqueness guarantee on `public_key_address`; a create
//! that loses a race reports [`StoreError::Conflict`] instead of producing a
//! second record.
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use common::models::identity::{Identity, NewIdentity};
use thiserror::Error;

pub use memory::MemoryIdentityStore;
pub use rest::RestIdentityStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity already exists for address")]
    Conflict,

    #[error("{0}")]
    Backend(String),

    #[error("identity store request timed out")]
    Timeout,

    #[error("identity store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StoreError {
    /// Text safe to hand to a client; transport details stay in the logs
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Backend(message) => message.clone(),
            StoreError::Conflict => self.to_string(),
            StoreError::Timeout | StoreError::Transport(_) => {
                "Identity store unavailable".to_string()
            }
        }
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Indexed lookup by wallet address
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity; `Conflict` if the address is already taken
    async fn create(&self, record: NewIdentity) -> Result<Identity, StoreError>;
}
