//! Refresh-token rotation.
//!
//! Retiring the old refresh token and fencing its `jti` happen inside one
//! store script, so two concurrent rotations of the same token can never
//! both succeed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use sessionguard_cache::keys;
use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::{SessionStore, StoreScript};
use sessionguard_core::types::{SessionId, TokenMode};

use super::{IssuedToken, SessionInvalidator, TokenError, TokenIssuer};
use crate::jwt::Claims;

/// Reply of the rotation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotateOutcome {
    Rotated,
    Reused,
    Invalid,
}

impl RotateOutcome {
    fn parse(reply: &str) -> Result<Self, AppError> {
        match reply {
            "OK" => Ok(Self::Rotated),
            "REUSED" => Ok(Self::Reused),
            "INVALID" => Ok(Self::Invalid),
            other => Err(AppError::internal(format!(
                "Unexpected rotation script reply: '{other}'"
            ))),
        }
    }
}

/// Exchanges a verified refresh token for a new one in the same family.
#[derive(Debug, Clone)]
pub struct RotationCoordinator {
    issuer: TokenIssuer,
    store: Arc<dyn SessionStore>,
    invalidator: SessionInvalidator,
    /// Lifetime of the replay fence for a consumed `jti`.
    used_ttl: Duration,
}

impl RotationCoordinator {
    /// Creates a coordinator; the replay fence lives for `config.used_refresh_ttl()`.
    pub fn new(
        issuer: TokenIssuer,
        store: Arc<dyn SessionStore>,
        invalidator: SessionInvalidator,
        config: &TokenConfig,
    ) -> Self {
        Self {
            issuer,
            store,
            invalidator,
            used_ttl: config.used_refresh_ttl(),
        }
    }

    /// Rotate a refresh token that the caller has already verified.
    ///
    /// The new token gets a fresh `session_id` and `jti` in the same family,
    /// and the family marker is rewritten for a full refresh TTL. Reuse,
    /// a missing family, or a liveness mismatch tear down every session of
    /// the subject before failing.
    pub async fn rotate(&self, old: &Claims) -> Result<IssuedToken, TokenError> {
        let Some(sub) = old.sub.as_ref() else {
            return Err(TokenError::StructureInvalid);
        };
        let (Some(jti), Some(session_id), Some(family)) =
            (old.jti.as_ref(), old.session_id.as_ref(), old.family.as_ref())
        else {
            warn!(sub = %sub, "Rotation attempted with incomplete refresh claims");
            self.invalidator.invalidate_all_best_effort(sub).await;
            return Err(TokenError::StructureInvalid);
        };
        if old.mode != Some(TokenMode::RefreshToken) {
            warn!(sub = %sub, mode = ?old.mode, "Rotation attempted with non-refresh token");
            self.invalidator.invalidate_all_best_effort(sub).await;
            return Err(TokenError::StructureInvalid);
        }

        if !self.store.exists(&keys::family(sub, family)).await? {
            warn!(
                sub = %sub,
                family = %family,
                kind = "family_invalidated",
                "Rotation attempted on invalidated family"
            );
            self.invalidator.invalidate_all_best_effort(sub).await;
            return Err(TokenError::FamilyInvalidated);
        }

        let script_keys = [keys::refresh(sub, session_id), keys::used(sub, jti)];
        let args = [
            jti.to_string(),
            self.used_ttl.as_secs().max(1).to_string(),
        ];
        let reply = self
            .store
            .run_atomic_script(StoreScript::RotateRefresh, &script_keys, &args)
            .await?;

        match RotateOutcome::parse(&reply)? {
            RotateOutcome::Rotated => {}
            RotateOutcome::Reused => {
                warn!(
                    sub = %sub,
                    family = %family,
                    session_id = %session_id,
                    kind = "reuse_detected",
                    "Refresh token reuse detected during rotation"
                );
                self.invalidator.invalidate_all_best_effort(sub).await;
                return Err(TokenError::ReuseDetected);
            }
            RotateOutcome::Invalid => {
                warn!(
                    sub = %sub,
                    family = %family,
                    session_id = %session_id,
                    kind = "liveness_mismatch",
                    "Refresh token no longer live during rotation"
                );
                self.invalidator.invalidate_all_best_effort(sub).await;
                return Err(TokenError::LivenessMismatch);
            }
        }

        // The old token is already retired; a failure here leaves the
        // client without a refresh token and it must log in again.
        let issued = self
            .issuer
            .issue_refresh_token(sub, Some(SessionId::generate()), Some(family.clone()))
            .await
            .inspect_err(|e| {
                error!(sub = %sub, family = %family, error = %e, "Failed to issue rotated refresh token");
            })?;

        info!(
            sub = %sub,
            family = %family,
            old_session_id = %session_id,
            session_id = ?issued.payload.session_id(),
            "Refresh token rotated"
        );
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenPayload;
    use crate::test_support::{Fault, StoreOp, faulty_harness, harness};
    use sessionguard_core::types::Subject;

    async fn login(h: &crate::test_support::Harness) -> (IssuedToken, Claims) {
        let refresh = h
            .issuer
            .issue_refresh_token(&Subject::from("u1"), Some("s1".into()), Some("f1".into()))
            .await
            .unwrap();
        let claims = Claims::from(refresh.payload.clone());
        (refresh, claims)
    }

    #[tokio::test]
    async fn test_rotate_once_then_reuse() {
        let h = harness().await;
        let (_, old) = login(&h).await;

        let rotated = h.rotation.rotate(&old).await.unwrap();
        let TokenPayload::Refresh(new) = &rotated.payload else {
            panic!("expected refresh payload");
        };
        assert_eq!(new.family.as_str(), "f1");
        assert_ne!(new.session_id.as_str(), "s1");
        assert_ne!(Some(&new.jti), old.jti.as_ref());
        assert!(!h.store.exists("refresh:u1:s1").await.unwrap());
        assert!(h
            .store
            .exists(&format!("used:u1:{}", old.jti.as_ref().unwrap()))
            .await
            .unwrap());

        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::ReuseDetected)
        ));
        assert!(h.memory.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_single_winner() {
        let h = harness().await;
        let (_, old) = login(&h).await;

        let (a, b) = tokio::join!(h.rotation.rotate(&old), h.rotation.rotate(&old));
        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(TokenError::ReuseDetected) | Err(TokenError::LivenessMismatch)
        ));
    }

    #[tokio::test]
    async fn test_stale_refresh_marker_is_invalid() {
        let h = harness().await;
        let (_, old) = login(&h).await;
        h.store
            .set("refresh:u1:s1", "other", Duration::from_secs(60))
            .await
            .unwrap();
        h.issuer
            .issue_access_token(&Subject::from("u1"), None)
            .await
            .unwrap();

        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::LivenessMismatch)
        ));
        assert!(h.memory.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_family() {
        let h = harness().await;
        let (_, old) = login(&h).await;
        h.store.delete(&["family:u1:f1".to_string()]).await.unwrap();
        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::FamilyInvalidated)
        ));
        assert!(h.memory.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_claims() {
        let h = harness().await;
        let (_, mut old) = login(&h).await;
        old.family = None;
        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::StructureInvalid)
        ));
        assert!(h.memory.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_recovers_after_script_flush() {
        let h = harness().await;
        let (_, old) = login(&h).await;
        h.memory.flush_scripts().await;
        assert!(h.rotation.rotate(&old).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_family_ttl_extended() {
        let h = harness().await;
        let (_, old) = login(&h).await;
        tokio::time::advance(Duration::from_secs(30 * 60)).await;

        h.rotation.rotate(&old).await.unwrap();
        let ttl = h.store.ttl_remaining("family:u1:f1").await.unwrap().unwrap();
        assert_eq!(ttl, Duration::from_secs(60 * 60));
    }

    #[tokio::test]
    async fn test_reuse_reported_when_teardown_fails() {
        let (h, faults) = faulty_harness().await;
        let (_, old) = login(&h).await;
        h.rotation.rotate(&old).await.unwrap();

        faults.fail(StoreOp::Delete, Fault::Timeout).await;
        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::ReuseDetected)
        ));
        assert!(h.memory.exists("family:u1:f1").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let (h, faults) = faulty_harness().await;
        let (_, old) = login(&h).await;

        faults.fail(StoreOp::Exists, Fault::Unavailable).await;
        assert!(matches!(
            h.rotation.rotate(&old).await,
            Err(TokenError::Internal(_))
        ));
        assert!(h.memory.exists("refresh:u1:s1").await.unwrap());
    }
}
