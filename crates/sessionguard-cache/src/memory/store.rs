//! In-memory session store using a Tokio mutex for single-node deployments.
//!
//! Every operation, including script execution, runs under one lock, so
//! scripts are trivially atomic with respect to all other calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{ScanPage, SessionStore, StoreScript};

use super::glob;
use crate::keys;

/// A stored value and its optional deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Internal state for the memory-based store.
#[derive(Debug, Default)]
struct InnerState {
    /// Keyspace, ordered so a scan can resume after the last key it examined.
    entries: BTreeMap<String, Entry>,
    /// Scripts registered via `load_script`.
    scripts: HashSet<StoreScript>,
    /// Open scan cursors and the last key each one examined.
    cursors: HashMap<u64, String>,
    /// Last cursor handed out; `0` is reserved for "start" and "done".
    last_cursor: u64,
}

impl InnerState {
    /// Read a live entry, dropping it if its deadline has passed.
    fn live(&mut self, key: &str) -> Option<&Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get(key)
    }

    fn insert(&mut self, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, e| e.is_live(now));
    }

    /// Native counterpart of the Redis rotation script.
    fn rotate_refresh(&mut self, script_keys: &[String], args: &[String]) -> AppResult<String> {
        let [refresh_key, used_key] = script_keys else {
            return Err(AppError::internal(
                "rotate_refresh expects exactly two keys",
            ));
        };
        let [expected_jti, used_ttl] = args else {
            return Err(AppError::internal(
                "rotate_refresh expects exactly two arguments",
            ));
        };
        let used_ttl: u64 = used_ttl
            .parse()
            .map_err(|_| AppError::internal(format!("Invalid used TTL '{used_ttl}'")))?;

        if self.live(used_key).is_some() {
            return Ok("REUSED".to_string());
        }

        let stored = self.live(refresh_key).map(|e| e.value.as_str());
        if stored != Some(expected_jti.as_str()) {
            return Ok("INVALID".to_string());
        }

        self.insert(used_key, keys::USED_MARKER, Duration::from_secs(used_ttl));
        self.entries.remove(refresh_key);
        Ok("OK".to_string())
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
}

impl MemorySessionStore {
    /// Creates an empty store with no scripts registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every registered script, as `SCRIPT FLUSH` would.
    pub async fn flush_scripts(&self) {
        self.state.lock().await.scripts.clear();
    }

    /// Snapshot of all live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        state.purge_expired();
        state.entries.keys().cloned().collect()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut state = self.state.lock().await;
        Ok(state.live(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.state.lock().await.insert(key, value, ttl);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.live(key).is_some() {
            return Ok(false);
        }
        state.insert(key, value, ttl);
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut deleted = 0u64;
        for key in keys {
            if state.live(key).is_some() {
                state.entries.remove(key);
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.state.lock().await.live(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.live(key).is_none() {
            return Ok(false);
        }
        if let Some(entry) = state.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(true)
    }

    async fn ttl_remaining(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        Ok(state
            .live(key)
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    /// The cursor resumes strictly after the last key examined, so keys
    /// present for the whole enumeration are returned regardless of
    /// deletions or expiries between steps, matching `SCAN` guarantees.
    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> AppResult<ScanPage> {
        let mut state = self.state.lock().await;
        state.purge_expired();
        let lower = if cursor == 0 {
            Bound::Unbounded
        } else {
            let last = state.cursors.remove(&cursor).ok_or_else(|| {
                AppError::internal(format!("Unknown or finished scan cursor {cursor}"))
            })?;
            Bound::Excluded(last)
        };

        let mut examined = 0;
        let mut last_examined = None;
        let mut keys = Vec::new();
        for key in state.entries.range::<String, _>((lower, Bound::Unbounded)).map(|(k, _)| k) {
            if examined == count.max(1) {
                break;
            }
            examined += 1;
            if glob::matches(pattern, key) {
                keys.push(key.clone());
            }
            last_examined = Some(key.clone());
        }

        let exhausted = match &last_examined {
            Some(last) => state
                .entries
                .range::<String, _>((Bound::Excluded(last.clone()), Bound::Unbounded))
                .next()
                .is_none(),
            None => true,
        };
        let next = match last_examined {
            Some(last) if !exhausted => {
                state.last_cursor = state.last_cursor.wrapping_add(1).max(1);
                let id = state.last_cursor;
                state.cursors.insert(id, last);
                id
            }
            _ => 0,
        };

        Ok(ScanPage { cursor: next, keys })
    }

    async fn load_script(&self, script: StoreScript) -> AppResult<()> {
        self.state.lock().await.scripts.insert(script);
        debug!(script = script.name(), "Registered in-memory script");
        Ok(())
    }

    async fn eval_script(
        &self,
        script: StoreScript,
        keys: &[String],
        args: &[String],
    ) -> AppResult<String> {
        let mut state = self.state.lock().await;
        if !state.scripts.contains(&script) {
            return Err(AppError::script_not_found(format!(
                "Script '{}' is not registered",
                script.name()
            )));
        }
        match script {
            StoreScript::RotateRefresh => state.rotate_refresh(keys, args),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
