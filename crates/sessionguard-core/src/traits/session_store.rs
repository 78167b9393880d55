//! Session store contract: a shared key-value store with TTLs, cursor
//! enumeration, and atomic script execution.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ErrorKind;
use crate::result::AppResult;

/// Scripts the token core registers with the store.
///
/// Each backend supplies its own implementation of the named script; the
/// contract is that a script runs as one indivisible unit against the
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScript {
    /// Retire a refresh token and fence its `jti` against replay.
    ///
    /// KEYS = `[refresh_key, used_key]`, ARGV = `[expected_jti, used_ttl_seconds]`.
    /// Replies `REUSED`, `INVALID`, or `OK`.
    RotateRefresh,
}

impl StoreScript {
    /// Stable name used in logs and by backends without script hashes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RotateRefresh => "rotate_refresh",
        }
    }
}

/// One step of a cursor-based key enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next step; `0` means the enumeration is complete.
    pub cursor: u64,
    /// Keys returned by this step (may be empty even when `cursor != 0`).
    pub keys: Vec<String>,
}

/// Trait for session store backends (Redis or in-memory).
///
/// Implementations are shared process-wide behind an `Arc` and must not
/// cache values locally: the backing store is the single source of truth.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value only if the key does not already exist.
    /// Returns `true` if the value was set.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete keys. Returns the number of keys that existed.
    async fn delete(&self, keys: &[String]) -> AppResult<u64>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Reset the TTL of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Remaining TTL of a key, or `None` if the key is absent or has no TTL.
    async fn ttl_remaining(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Advance a non-blocking enumeration of keys matching a glob pattern.
    ///
    /// Start with cursor `0`; continue until the returned cursor is `0`.
    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> AppResult<ScanPage>;

    /// Register a script with the store.
    async fn load_script(&self, script: StoreScript) -> AppResult<()>;

    /// Execute a previously registered script.
    ///
    /// Fails with [`ErrorKind::ScriptNotFound`] when the store does not know
    /// the script (e.g. after a restart flushed its script cache).
    async fn eval_script(
        &self,
        script: StoreScript,
        keys: &[String],
        args: &[String],
    ) -> AppResult<String>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Execute a script, re-registering it once if the store lost it.
    async fn run_atomic_script(
        &self,
        script: StoreScript,
        keys: &[String],
        args: &[String],
    ) -> AppResult<String> {
        match self.eval_script(script, keys, args).await {
            Err(e) if e.kind == ErrorKind::ScriptNotFound => {
                debug!(script = script.name(), "Script missing from store, re-registering");
                self.load_script(script).await?;
                self.eval_script(script, keys, args).await
            }
            other => other,
        }
    }

    /// Collect every key matching a pattern by walking the cursor to completion.
    async fn scan(&self, pattern: &str, count: usize) -> AppResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let page = self.scan_page(pattern, cursor, count).await?;
            keys.extend(page.keys);
            if page.cursor == 0 {
                break;
            }
            cursor = page.cursor;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
