//! Session store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use sessionguard_core::config::StoreConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{ScanPage, SessionStore, StoreScript};

/// Session store manager that wraps the configured backend.
///
/// Constructed once per process and passed explicitly to every token
/// component.
#[derive(Debug, Clone)]
pub struct SessionStoreManager {
    /// The inner store.
    inner: Arc<dyn SessionStore>,
}

impl SessionStoreManager {
    /// Create a new store manager from configuration.
    ///
    /// Scripts are registered eagerly; a later `NOSCRIPT` is still
    /// recovered by re-registration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn SessionStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis session store");
                Arc::new(crate::redis::RedisSessionStore::connect(config).await?)
            }
            "memory" => {
                info!("Initializing in-memory session store");
                Arc::new(crate::memory::MemorySessionStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: redis, memory"
                )));
            }
        };

        inner.load_script(StoreScript::RotateRefresh).await?;
        Ok(Self { inner })
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn SessionStore>) -> Self {
        Self { inner: store }
    }
}

#[async_trait]
impl SessionStore for SessionStoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        self.inner.delete(keys).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn ttl_remaining(&self, key: &str) -> AppResult<Option<Duration>> {
        self.inner.ttl_remaining(key).await
    }

    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> AppResult<ScanPage> {
        self.inner.scan_page(pattern, cursor, count).await
    }

    async fn load_script(&self, script: StoreScript) -> AppResult<()> {
        self.inner.load_script(script).await
    }

    async fn eval_script(
        &self,
        script: StoreScript,
        keys: &[String],
        args: &[String],
    ) -> AppResult<String> {
        self.inner.eval_script(script, keys, args).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
