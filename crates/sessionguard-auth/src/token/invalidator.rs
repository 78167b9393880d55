//! Bulk revocation of a subject's sessions.

use std::sync::Arc;

use tracing::{error, info};

use sessionguard_cache::keys;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::SessionStore;
use sessionguard_core::types::{SessionId, Subject};

/// Deletes every session key of a subject via cursor-based enumeration.
#[derive(Debug, Clone)]
pub struct SessionInvalidator {
    store: Arc<dyn SessionStore>,
    /// Keys requested per `SCAN` step and deleted per `DEL`.
    batch_size: usize,
}

impl SessionInvalidator {
    /// Creates an invalidator; a zero `batch_size` is raised to 1.
    pub fn new(store: Arc<dyn SessionStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Delete all `access`, `refresh`, `family` and `used` keys of `sub`.
    ///
    /// Every namespace is attempted even if an earlier one fails; the first
    /// failure is returned. Returns the number of keys deleted.
    pub async fn invalidate_all(&self, sub: &Subject) -> AppResult<u64> {
        let (deleted, failure) = self.sweep(sub).await;
        match failure {
            Some(e) => Err(e),
            None => {
                info!(sub = %sub, deleted, "All sessions invalidated");
                Ok(deleted)
            }
        }
    }

    /// Like [`invalidate_all`](Self::invalidate_all) but never fails:
    /// store errors are logged and the sweep continues.
    pub async fn invalidate_all_best_effort(&self, sub: &Subject) -> u64 {
        let (deleted, failure) = self.sweep(sub).await;
        match failure {
            Some(e) => error!(
                sub = %sub,
                deleted,
                error = %e,
                "Session invalidation incomplete"
            ),
            None => info!(sub = %sub, deleted, "All sessions invalidated"),
        }
        deleted
    }

    /// Delete the access and refresh liveness keys of one session.
    pub async fn invalidate_session(&self, sub: &Subject, session_id: &SessionId) -> AppResult<u64> {
        let deleted = self
            .store
            .delete(&[keys::access(sub, session_id), keys::refresh(sub, session_id)])
            .await?;
        info!(sub = %sub, session_id = %session_id, deleted, "Session invalidated");
        Ok(deleted)
    }

    async fn sweep(&self, sub: &Subject) -> (u64, Option<AppError>) {
        let mut deleted = 0;
        let mut failure = None;
        for namespace in keys::SESSION_NAMESPACES {
            match self.invalidate_namespace(namespace, sub).await {
                Ok(n) => deleted += n,
                Err(e) => {
                    error!(sub = %sub, namespace, error = %e, "Failed to invalidate namespace");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        (deleted, failure)
    }

    /// Keys are collected before deletion so removals cannot shift a cursor
    /// that is still being walked.
    async fn invalidate_namespace(&self, namespace: &str, sub: &Subject) -> AppResult<u64> {
        let matched = self
            .store
            .scan(&keys::subject_pattern(namespace, sub), self.batch_size)
            .await?;
        let owned: Vec<String> = matched
            .into_iter()
            .filter(|k| keys::belongs_to(k, namespace, sub))
            .collect();

        let mut deleted = 0;
        for chunk in owned.chunks(self.batch_size) {
            deleted += self.store.delete(chunk).await?;
        }
        Ok(deleted)
    }
}
