// verify-server/src/store/memory.rs
use async_trait::async_trait;
use common::models::identity::{Identity, NewIdentity};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::{IdentityStore, StoreError};

/// In-process identity store indexed by wallet address
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    by_address: Arc<DashMap<String, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.by_address.get(address).map(|entry| entry.value().clone()))
    }

    async fn create(&self, record: NewIdentity) -> Result<Identity, StoreError> {
        // The entry lock makes check-and-insert atomic per address
        match self.by_address.entry(record.public_key_address.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let identity = record.into_identity();
                slot.insert(identity.clone());
                Ok(identity)
            }
        }
    }
}
