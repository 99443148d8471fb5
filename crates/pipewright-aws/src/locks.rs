//! Named async mutexes for per-account singleton resources.
//!
//! Several pipelines deploying concurrently may all want the same singleton
//! role or Lambda stack. Holding the named lock across the check-then-create
//! makes the ensure race-free within this process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

#[derive(Clone, Default)]
pub struct SingletonLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SingletonLocks {
    /// Acquire the lock for a named singleton, creating it on first use.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = SingletonLocks::default();
        let in_flight = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("deploy-role-111122223333").await;
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = SingletonLocks::default();
        let _a = locks.acquire("a").await;
        // Would deadlock if keys shared a mutex.
        let _b = locks.acquire("b").await;
    }
}
