//! Login, rotate, then replay a stolen copy of the first refresh token.

use sessionguard_auth::{TokenError, TokenPayload};
use sessionguard_core::types::{FamilyId, SessionId, Subject};

use crate::helpers::{TestApp, claims_of};

#[tokio::test]
async fn test_stolen_refresh_token_replay() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");

    // u1 logs in: (access_1, refresh_1) in family f1, session s1.
    let refresh_1 = app
        .tokens
        .issuer
        .issue_refresh_token(&sub, Some(SessionId::from("s1")), Some(FamilyId::from("f1")))
        .await
        .unwrap();
    let access_1 = app
        .tokens
        .issuer
        .issue_access_token(&sub, Some(SessionId::from("s1")))
        .await
        .unwrap();
    let jti_1 = refresh_1.payload.jti().cloned().unwrap();
    assert!(app.tokens.verifier.verify(&access_1.token).await.is_ok());

    // Rotation: refresh_2 in family f1 with a new session.
    let refresh_2 = app
        .tokens
        .rotation
        .rotate(&claims_of(&refresh_1.payload))
        .await
        .unwrap();
    let TokenPayload::Refresh(claims_2) = &refresh_2.payload else {
        panic!("expected a refresh payload");
    };
    assert_eq!(claims_2.family.as_str(), "f1");
    let s2 = claims_2.session_id.clone();
    assert_ne!(s2.as_str(), "s1");
    assert!(!app.exists("refresh:u1:s1").await);
    assert!(app.exists(&format!("used:u1:{jti_1}")).await);
    assert!(app.tokens.verifier.verify(&refresh_2.token).await.is_ok());

    // Replay of the stolen refresh_1.
    let replay = app
        .tokens
        .rotation
        .rotate(&claims_of(&refresh_1.payload))
        .await;
    assert!(matches!(replay, Err(TokenError::ReuseDetected)));
    assert!(!app.exists("family:u1:f1").await);
    assert!(!app.exists(&format!("refresh:u1:{s2}")).await);

    let next = app.tokens.verifier.verify(&refresh_2.token).await;
    assert!(matches!(
        next,
        Err(TokenError::FamilyInvalidated) | Err(TokenError::LivenessMismatch)
    ));
    assert!(app.keys_of("u1").await.is_empty());
}

#[tokio::test]
async fn test_replay_through_refresh_flow() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let other = app.manager.login(&Subject::from("u2"), crate::helpers::PASSWORD).await.unwrap();

    let first = app.manager.login(&sub, crate::helpers::PASSWORD).await.unwrap();
    let second = app.manager.refresh(&first.refresh_token).await.unwrap();

    assert!(app.manager.refresh(&first.refresh_token).await.is_err());
    assert!(app.manager.authenticate(&second.access_token).await.is_err());
    assert!(app.manager.refresh(&second.refresh_token).await.is_err());
    assert!(app.keys_of("u1").await.is_empty());

    // The other user is unaffected.
    assert!(app.manager.authenticate(&other.access_token).await.is_ok());
    assert!(app.manager.refresh(&other.refresh_token).await.is_ok());
}
