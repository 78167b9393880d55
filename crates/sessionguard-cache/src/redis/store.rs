//! Redis-backed session store.
//!
//! Suitable for multi-node deployments: all instances share one keyspace
//! and multi-key updates run as server-side Lua scripts.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use sessionguard_core::config::StoreConfig;
use sessionguard_core::error::{AppError, ErrorKind};
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{ScanPage, SessionStore, StoreScript};

use super::client::RedisClient;
use super::scripts;

/// Redis-backed session store.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    /// Redis client.
    client: RedisClient,
    /// Deadline applied to every command.
    command_timeout: Duration,
    /// Rotation script with its precomputed SHA1.
    rotate_refresh: redis::Script,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    pub fn new(client: RedisClient, config: &StoreConfig) -> Self {
        Self {
            client,
            command_timeout: config.command_timeout(),
            rotate_refresh: redis::Script::new(scripts::source(StoreScript::RotateRefresh)),
        }
    }

    /// Connect using the store configuration.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let client = RedisClient::connect(&config.redis).await?;
        Ok(Self::new(client, config))
    }

    fn script(&self, script: StoreScript) -> &redis::Script {
        match script {
            StoreScript::RotateRefresh => &self.rotate_refresh,
        }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        if e.code() == Some("NOSCRIPT") {
            return AppError::with_source(ErrorKind::ScriptNotFound, "Redis script not loaded", e);
        }
        AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
    }

    /// Run a command future under the configured deadline.
    async fn bounded<T, F>(&self, command: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(Self::map_err),
            Err(_) => Err(AppError::timeout(format!(
                "Redis {command} exceeded {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        self.bounded("GET", redis::cmd("GET").arg(&full_key).query_async(&mut conn))
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = self
            .bounded(
                "SET",
                redis::cmd("SET")
                    .arg(&full_key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl.as_millis() as u64)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        // SET key value PX ttl NX
        let result: Option<String> = self
            .bounded(
                "SET NX",
                redis::cmd("SET")
                    .arg(&full_key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl.as_millis() as u64)
                    .arg("NX")
                    .query_async(&mut conn),
            )
            .await?;
        Ok(result.is_some())
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let full_keys: Vec<String> = keys.iter().map(|k| self.client.prefixed_key(k)).collect();
        let mut conn = self.client.conn_mut();
        self.bounded("DEL", redis::cmd("DEL").arg(&full_keys).query_async(&mut conn))
            .await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let count: u64 = self
            .bounded(
                "EXISTS",
                redis::cmd("EXISTS").arg(&full_key).query_async(&mut conn),
            )
            .await?;
        Ok(count > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let updated: u64 = self
            .bounded(
                "PEXPIRE",
                redis::cmd("PEXPIRE")
                    .arg(&full_key)
                    .arg(ttl.as_millis() as u64)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(updated == 1)
    }

    async fn ttl_remaining(&self, key: &str) -> AppResult<Option<Duration>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        // -2 = missing, -1 = no expiry
        let millis: i64 = self
            .bounded("PTTL", redis::cmd("PTTL").arg(&full_key).query_async(&mut conn))
            .await?;
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> AppResult<ScanPage> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();
        let (next, keys): (u64, Vec<String>) = self
            .bounded(
                "SCAN",
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&full_pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async(&mut conn),
            )
            .await?;

        Ok(ScanPage {
            cursor: next,
            keys: keys
                .into_iter()
                .map(|k| self.client.unprefixed_key(k))
                .collect(),
        })
    }

    async fn load_script(&self, script: StoreScript) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let sha: String = self
            .bounded(
                "SCRIPT LOAD",
                redis::cmd("SCRIPT")
                    .arg("LOAD")
                    .arg(scripts::source(script))
                    .query_async(&mut conn),
            )
            .await?;
        info!(script = script.name(), sha = %sha, "Registered Redis script");
        Ok(())
    }

    async fn eval_script(
        &self,
        script: StoreScript,
        keys: &[String],
        args: &[String],
    ) -> AppResult<String> {
        let full_keys: Vec<String> = keys.iter().map(|k| self.client.prefixed_key(k)).collect();
        let argv: Vec<String> = args.to_vec();
        let mut conn = self.client.conn_mut();
        let reply: String = self
            .bounded(
                "EVALSHA",
                redis::cmd("EVALSHA")
                    .arg(self.script(script).get_hash())
                    .arg(full_keys.len())
                    .arg(&full_keys)
                    .arg(&argv)
                    .query_async(&mut conn),
            )
            .await?;
        debug!(script = script.name(), reply = %reply, "Script executed");
        Ok(reply)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(pong == "PONG")
    }
}
