//! Execution slot pool
//!
//! Every request evaluates its script in a fresh context, so there are no
//! long-lived engine instances to recycle. What the pool bounds is the
//! number of scripts executing at once: each run must hold an
//! [`ExecutionSlot`] for its duration, and excess requests wait on the
//! semaphore instead of piling blocking threads onto the runtime.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use scriptserve_common::error::{EngineError, Result};

/// Configuration for the execution slot pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub max_concurrent: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_concurrent: 32 }
    }
}

/// Permit to run one script. Released back to the pool on drop.
pub struct ExecutionSlot {
    _permit: OwnedSemaphorePermit,
}

/// Bounds concurrent script execution across the server.
pub struct ScriptContextPool {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ScriptContextPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            max_concurrent: config.max_concurrent,
        }
    }

    /// Waits for a free slot. Returns once this request may execute.
    pub async fn acquire(&self) -> Result<ExecutionSlot> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EngineError::ScriptFault(format!("execution pool closed: {e}")))?;
        Ok(ExecutionSlot { _permit: permit })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Slots not currently held by a running script.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert!(config.max_concurrent > 0);
    }

    #[tokio::test]
    async fn test_acquire_release() {
        let pool = ScriptContextPool::new(PoolConfig { max_concurrent: 2 });
        assert_eq!(pool.available(), 2);

        let slot = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 1);

        drop(slot);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_waits() {
        let pool = Arc::new(ScriptContextPool::new(PoolConfig { max_concurrent: 1 }));

        let slot = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                let _slot = pool.acquire().await.unwrap();
            })
        };

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(slot);
        waiter.await.unwrap();
    }
}
