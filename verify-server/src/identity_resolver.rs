// verify-server/src/identity_resolver.rs
use common::models::identity::{Identity, NewIdentity};
use common::utils::placeholder_password;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{IdentityStore, StoreError};

/// Maps a wallet address to its identity, creating it on first sign-in
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn resolve_or_create(&self, address: &str) -> Result<Identity, StoreError> {
        if let Some(identity) = self.bounded(self.store.find_by_address(address)).await? {
            tracing::debug!("Resolved existing identity {} for {}", identity.id, address);
            return Ok(identity);
        }

        let record = NewIdentity::for_address(address, placeholder_password());
        match self.bounded(self.store.create(record)).await {
            Ok(identity) => {
                tracing::info!("Created identity {} for wallet {}", identity.id, address);
                Ok(identity)
            }
            Err(StoreError::Conflict) => {
                // Another sign-in for the same address won the insert
                tracing::warn!("Concurrent identity creation for {}, re-reading", address);
                self.bounded(self.store.find_by_address(address))
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(
                            "identity conflict reported but no record found".to_string(),
                        )
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryIdentityStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    fn resolver(store: Arc<dyn IdentityStore>) -> IdentityResolver {
        IdentityResolver::new(store, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_same_address_resolves_to_same_identity() {
        let store = MemoryIdentityStore::new();
        let resolver = resolver(Arc::new(store.clone()));

        let first = resolver.resolve_or_create("addr1").await.unwrap();
        let second = resolver.resolve_or_create("addr1").await.unwrap();
        let other = resolver.resolve_or_create("addr2").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
        assert_eq!(store.len(), 2);
        assert_eq!(first.email, "addr1@example.com");
    }

    /// Reports "not found" to the first `n` lookups, all at once, so every
    /// caller proceeds to create.
    struct StaleReadStore {
        inner: MemoryIdentityStore,
        stale_reads: usize,
        reads: AtomicUsize,
        barrier: Barrier,
    }

    #[async_trait]
    impl IdentityStore for StaleReadStore {
        async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) < self.stale_reads {
                self.barrier.wait().await;
                return Ok(None);
            }
            self.inner.find_by_address(address).await
        }

        async fn create(&self, record: NewIdentity) -> Result<Identity, StoreError> {
            self.inner.create(record).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_first_sign_ins_create_one_identity() {
        const CALLERS: usize = 16;
        let inner = MemoryIdentityStore::new();
        let store = Arc::new(StaleReadStore {
            inner: inner.clone(),
            stale_reads: CALLERS,
            reads: AtomicUsize::new(0),
            barrier: Barrier::new(CALLERS),
        });
        let resolver = resolver(store);

        let tasks: Vec<_> = (0..CALLERS)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve_or_create("racy-addr").await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }

        assert_eq!(inner.len(), 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    struct SlowStore;

    #[async_trait]
    impl IdentityStore for SlowStore {
        async fn find_by_address(&self, _address: &str) -> Result<Option<Identity>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn create(&self, _record: NewIdentity) -> Result<Identity, StoreError> {
            unreachable!("lookup never completes")
        }
    }

    #[tokio::test]
    async fn test_store_call_is_bounded_by_timeout() {
        let resolver = IdentityResolver::new(Arc::new(SlowStore), Duration::from_millis(20));
        assert!(matches!(
            resolver.resolve_or_create("addr1").await,
            Err(StoreError::Timeout)
        ));
    }

    struct FailingStore;

    #[async_trait]
    impl IdentityStore for FailingStore {
        async fn find_by_address(&self, _address: &str) -> Result<Option<Identity>, StoreError> {
            Ok(None)
        }

        async fn create(&self, _record: NewIdentity) -> Result<Identity, StoreError> {
            Err(StoreError::Backend("Database error creating new user".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_error_surfaces_unchanged() {
        let resolver = resolver(Arc::new(FailingStore));
        match resolver.resolve_or_create("addr1").await {
            Err(StoreError::Backend(message)) => {
                assert_eq!(message, "Database error creating new user")
            }
            other => panic!("unexpected result: {:?}", other.map(|i| i.id)),
        }
    }
}
