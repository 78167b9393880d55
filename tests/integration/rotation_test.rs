//! Rotation boundaries and races.

use std::time::Duration;

use sessionguard_auth::TokenError;
use sessionguard_core::types::Subject;

use crate::helpers::{TestApp, claims_of};

#[tokio::test]
async fn test_rotate_once_then_reuse_empties_user_keys() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let refresh = app.tokens.issuer.issue_refresh_token(&sub, None, None).await.unwrap();
    app.tokens.issuer.issue_access_token(&sub, None).await.unwrap();
    let old = claims_of(&refresh.payload);

    let rotated = app.tokens.rotation.rotate(&old).await.unwrap();
    let new = claims_of(&rotated.payload);
    assert_eq!(new.family, old.family);
    assert_ne!(new.session_id, old.session_id);
    assert_ne!(new.jti, old.jti);

    assert!(matches!(
        app.tokens.rotation.rotate(&old).await,
        Err(TokenError::ReuseDetected)
    ));
    assert!(app.keys_of("u1").await.is_empty());
}

#[tokio::test]
async fn test_concurrent_rotations_have_one_winner() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let refresh = app.tokens.issuer.issue_refresh_token(&sub, None, None).await.unwrap();
    let old = claims_of(&refresh.payload);

    let rotation = app.tokens.rotation.clone();
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let rotation = rotation.clone();
            let old = old.clone();
            tokio::spawn(async move { rotation.rotate(&old).await })
        })
        .collect();

    let mut wins = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => wins += 1,
            Err(TokenError::ReuseDetected) | Err(TokenError::LivenessMismatch) => {}
            Err(TokenError::FamilyInvalidated) => {}
            Err(other) => panic!("unexpected rotation error: {other}"),
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn test_replay_fence_ttl() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let refresh = app.tokens.issuer.issue_refresh_token(&sub, None, None).await.unwrap();
    let old = claims_of(&refresh.payload);
    app.tokens.rotation.rotate(&old).await.unwrap();

    let fence = format!("used:u1:{}", old.jti.as_ref().unwrap());
    let ttl = app.store.ttl_remaining(&fence).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(600));
    assert!(ttl > Duration::from_secs(590));
}
