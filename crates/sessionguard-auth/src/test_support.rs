//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tokio::sync::Mutex;

use sessionguard_cache::MemorySessionStore;
use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{ScanPage, SessionStore, StoreScript};

use crate::jwt::{Claims, TokenCodec};
use crate::token::{
    RotationCoordinator, SessionInvalidator, TokenIssuer, TokenServices, TokenVerifier,
};

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "test-access-secret".into(),
        verification_secret: "test-verification-secret".into(),
        reset_password_secret: "test-reset-secret".into(),
        algorithm: "HS256".into(),
        access_ttl_minutes: 15,
        refresh_ttl_minutes: 60,
        verification_ttl_minutes: 30,
        reset_password_ttl_minutes: 10,
        used_refresh_ttl_seconds: 600,
        leeway_seconds: 0,
    }
}

/// Sign arbitrary claims, bypassing the codec's mode-to-secret mapping.
pub fn forge(claims: &Claims, secret: &str, algorithm: Algorithm) -> String {
    jsonwebtoken::encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// All token components wired to one in-memory store.
pub struct Harness {
    pub memory: MemorySessionStore,
    pub store: Arc<dyn SessionStore>,
    pub codec: Arc<TokenCodec>,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
    pub rotation: RotationCoordinator,
    pub invalidator: SessionInvalidator,
}

pub async fn harness() -> Harness {
    let memory = MemorySessionStore::new();
    harness_over(memory.clone(), Arc::new(memory)).await
}

/// Harness whose components talk to a store that fails on demand.
pub async fn faulty_harness() -> (Harness, FaultyStore) {
    let memory = MemorySessionStore::new();
    let faulty = FaultyStore::new(memory.clone());
    let h = harness_over(memory, Arc::new(faulty.clone())).await;
    (h, faulty)
}

async fn harness_over(memory: MemorySessionStore, store: Arc<dyn SessionStore>) -> Harness {
    let config = token_config();
    memory
        .load_script(StoreScript::RotateRefresh)
        .await
        .unwrap();
    let codec = Arc::new(TokenCodec::new(&config).unwrap());
    // Small batches so enumeration walks several cursor steps.
    let TokenServices {
        issuer,
        verifier,
        rotation,
        invalidator,
    } = TokenServices::new(&config, store.clone(), 2).unwrap();

    Harness {
        memory,
        store,
        codec,
        issuer,
        verifier,
        rotation,
        invalidator,
    }
}

/// Store operations that [`FaultyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Exists,
    ScanPage,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Connection-level failure.
    Unavailable,
    /// Round-trip exceeded the command timeout.
    Timeout,
}

/// Wraps a memory store and fails selected operations.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: MemorySessionStore,
    faults: Arc<Mutex<HashMap<StoreOp, Fault>>>,
}

impl FaultyStore {
    pub fn new(inner: MemorySessionStore) -> Self {
        Self {
            inner,
            faults: Arc::default(),
        }
    }

    pub async fn fail(&self, op: StoreOp, fault: Fault) {
        self.faults.lock().await.insert(op, fault);
    }

    pub async fn heal(&self) {
        self.faults.lock().await.clear();
    }

    async fn check(&self, op: StoreOp) -> AppResult<()> {
        match self.faults.lock().await.get(&op) {
            None => Ok(()),
            Some(Fault::Unavailable) => Err(AppError::cache(format!("{op:?}: connection refused"))),
            Some(Fault::Timeout) => Err(AppError::timeout(format!("{op:?}: timed out"))),
        }
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check(StoreOp::Get).await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        self.check(StoreOp::Delete).await?;
        self.inner.delete(keys).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check(StoreOp::Exists).await?;
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn ttl_remaining(&self, key: &str) -> AppResult<Option<Duration>> {
        self.inner.ttl_remaining(key).await
    }

    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> AppResult<ScanPage> {
        self.check(StoreOp::ScanPage).await?;
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
