//! Round trips and rejections across all token modes.

use std::time::Duration;

use sessionguard_auth::TokenError;
use sessionguard_core::types::{Subject, TokenMode};

use crate::helpers::TestApp;

#[tokio::test]
async fn test_round_trip_every_mode() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let issuer = &app.tokens.issuer;
    let verifier = &app.tokens.verifier;

    let access = issuer.issue_access_token(&sub, None).await.unwrap();
    assert_eq!(verifier.verify(&access.token).await.unwrap(), access.payload);

    let refresh = issuer.issue_refresh_token(&sub, None, None).await.unwrap();
    assert_eq!(verifier.verify(&refresh.token).await.unwrap(), refresh.payload);

    let verification = issuer.issue_verification_token(&sub, Some("u1@example.com")).unwrap();
    assert_eq!(
        verifier
            .verify_purpose_token(&verification.token, TokenMode::VerificationToken)
            .unwrap(),
        verification.payload
    );

    let reset = issuer.issue_reset_password_token(&sub, None).unwrap();
    assert_eq!(
        verifier
            .verify_purpose_token(&reset.token, TokenMode::ResetPasswordToken)
            .unwrap(),
        reset.payload
    );
}

#[tokio::test]
async fn test_store_is_authoritative_over_exp() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");

    for mode in [TokenMode::AccessToken, TokenMode::RefreshToken] {
        let issued = match mode {
            TokenMode::AccessToken => app.tokens.issuer.issue_access_token(&sub, None).await,
            _ => app.tokens.issuer.issue_refresh_token(&sub, None, None).await,
        }
        .unwrap();
        let session = issued.payload.session_id().unwrap();
        let key = format!("{}:u1:{session}", mode.liveness_prefix().unwrap());

        app.store
            .set(&key, "rotated-away", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            app.tokens.verifier.verify(&issued.token).await,
            Err(TokenError::LivenessMismatch)
        ));
    }
}

#[tokio::test]
async fn test_cross_purpose_tokens_fail_closed() {
    let app = TestApp::new().await;
    let sub = Subject::from("u1");
    let verification = app.tokens.issuer.issue_verification_token(&sub, None).unwrap();
    let access = app.tokens.issuer.issue_access_token(&sub, None).await.unwrap();

    assert!(matches!(
        app.tokens.verifier.verify(&verification.token).await,
        Err(TokenError::Malformed)
    ));
    assert!(matches!(
        app.tokens
            .verifier
            .verify_purpose_token(&access.token, TokenMode::ResetPasswordToken),
        Err(TokenError::Malformed)
    ));
}
