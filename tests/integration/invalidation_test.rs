//! Mass invalidation cascades and isolation.

use sessionguard_auth::TokenError;
use sessionguard_core::types::Subject;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_invalidate_all_cascades_to_every_token() {
    let app = TestApp::new().await;
    let u1 = Subject::from("u1");
    let u2 = Subject::from("u2");

    let mut tokens = Vec::new();
    for _ in 0..4 {
        let refresh = app.tokens.issuer.issue_refresh_token(&u1, None, None).await.unwrap();
        let access = app
            .tokens
            .issuer
            .issue_access_token(&u1, refresh.payload.session_id().cloned())
            .await
            .unwrap();
        tokens.push(refresh.token);
        tokens.push(access.token);
    }
    let survivor = app.tokens.issuer.issue_refresh_token(&u2, None, None).await.unwrap();
    let u2_keys = app.keys_of("u2").await;

    app.tokens.invalidator.invalidate_all(&u1).await.unwrap();

    assert!(app.keys_of("u1").await.is_empty());
    for token in &tokens {
        assert!(matches!(
            app.tokens.verifier.verify(token).await,
            Err(TokenError::LivenessMismatch) | Err(TokenError::FamilyInvalidated)
        ));
    }
    assert_eq!(app.keys_of("u2").await, u2_keys);
    assert!(app.tokens.verifier.verify(&survivor.token).await.is_ok());
}

#[tokio::test]
async fn test_invalidate_all_is_idempotent() {
    let app = TestApp::new().await;
    let u1 = Subject::from("u1");
    app.tokens.issuer.issue_access_token(&u1, None).await.unwrap();

    assert_eq!(app.tokens.invalidator.invalidate_all(&u1).await.unwrap(), 1);
    assert_eq!(app.tokens.invalidator.invalidate_all(&u1).await.unwrap(), 0);
}
