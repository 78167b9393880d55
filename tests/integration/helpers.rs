//! Shared test helpers for integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sessionguard_auth::jwt::Claims;
use sessionguard_auth::{SessionManager, TokenServices};
use sessionguard_cache::{MemorySessionStore, SessionStoreManager};
use sessionguard_core::config::AppConfig;
use sessionguard_core::config::logging::LoggingConfig;
use sessionguard_core::config::password::PasswordConfig;
use sessionguard_core::config::StoreConfig;
use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{PasswordHashing, SessionStore, UserDirectory, UserRecord};
use sessionguard_core::types::Subject;

/// Password every seeded user starts with.
pub const PASSWORD: &str = "amber-Quarry-71-satchel";

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct TestDirectory {
    users: Mutex<HashMap<Subject, UserRecord>>,
}

impl TestDirectory {
    pub async fn insert(&self, user: UserRecord) {
        self.users.lock().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for TestDirectory {
    async fn find_user_by_id(&self, id: &Subject) -> AppResult<Option<UserRecord>> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn update_password_hash(&self, id: &Subject, password_hash: &str) -> AppResult<bool> {
        let mut users = self.users.lock().await;
        match users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_verified(&self, id: &Subject) -> AppResult<bool> {
        let mut users = self.users.lock().await;
        match users.get_mut(id) {
            Some(user) => {
                user.is_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Cheap reversible hasher; Argon2 is covered by its own unit tests.
#[derive(Debug)]
pub struct PlainHasher;

impl PasswordHashing for PlainHasher {
    fn hash(&self, plaintext: &str) -> AppResult<String> {
        Ok(format!("plain:{plaintext}"))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("plain:{plaintext}"))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        tokens: TokenConfig {
            access_secret: "it-access-secret".into(),
            verification_secret: "it-verification-secret".into(),
            reset_password_secret: "it-reset-secret".into(),
            algorithm: "HS256".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60,
            verification_ttl_minutes: 30,
            reset_password_ttl_minutes: 10,
            used_refresh_ttl_seconds: 600,
            leeway_seconds: 0,
        },
        store: StoreConfig {
            provider: "memory".to_string(),
            scan_batch_size: 3,
            ..StoreConfig::default()
        },
        password: PasswordConfig::default(),
        logging: LoggingConfig::default(),
    }
}

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: Subject::from(id),
        email: format!("{id}@example.com"),
        password_hash: format!("plain:{PASSWORD}"),
        is_active: true,
        is_verified: true,
    }
}

/// Test application context
pub struct TestApp {
    /// Raw store handle for key assertions.
    pub memory: MemorySessionStore,
    /// The store as the token core sees it.
    pub store: Arc<dyn SessionStore>,
    pub tokens: TokenServices,
    pub manager: SessionManager,
    pub users: Arc<TestDirectory>,
}

impl TestApp {
    /// Create a new test application with users `u1` and `u2`.
    pub async fn new() -> Self {
        let config = test_config();
        let memory = MemorySessionStore::new();
        let store: Arc<dyn SessionStore> = Arc::new(SessionStoreManager::from_store(Arc::new(
            memory.clone(),
        )));

        let users = Arc::new(TestDirectory::default());
        users.insert(user("u1")).await;
        users.insert(user("u2")).await;

        let manager = SessionManager::new(&config, store.clone(), users.clone(), Arc::new(PlainHasher))
            .expect("Failed to build session manager");
        let tokens = manager.tokens().clone();

        Self {
            memory,
            store,
            tokens,
            manager,
            users,
        }
    }

    /// All live keys that belong to `sub`, sorted.
    pub async fn keys_of(&self, sub: &str) -> Vec<String> {
        let marker = format!(":{sub}:");
        self.memory
            .keys()
            .await
            .into_iter()
            .filter(|k| k.contains(&marker))
            .collect()
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.store.exists(key).await.expect("store error")
    }
}

/// Wire claims of a token the test minted itself.
pub fn claims_of(payload: &sessionguard_auth::TokenPayload) -> Claims {
    Claims::from(payload.clone())
}
