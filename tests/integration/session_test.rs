//! Account flows end to end.

use sessionguard_core::error::ErrorKind;
use sessionguard_core::types::Subject;

use crate::helpers::{PASSWORD, TestApp};

const NEW_PASSWORD: &str = "violet-Tundra-42-lantern";

#[tokio::test]
async fn test_password_reset_ends_sessions_and_is_single_use() {
    let app = TestApp::new().await;
    let u1 = Subject::from("u1");
    let pair = app.manager.login(&u1, PASSWORD).await.unwrap();

    let token = app.manager.request_password_reset(&u1).await.unwrap();
    app.manager
        .confirm_password_reset(&format!("Bearer {token}"), NEW_PASSWORD)
        .await
        .unwrap();
    assert!(app.manager.authenticate(&pair.access_token).await.is_err());

    let err = app
        .manager
        .confirm_password_reset(&token, NEW_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    assert!(app.manager.login(&u1, PASSWORD).await.is_err());
    assert!(app.manager.login(&u1, NEW_PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_logout_keeps_other_sessions() {
    let app = TestApp::new().await;
    let u1 = Subject::from("u1");
    let phone = app.manager.login(&u1, PASSWORD).await.unwrap();
    let laptop = app.manager.login(&u1, PASSWORD).await.unwrap();

    app.manager
        .logout(&format!("Bearer {}", phone.access_token))
        .await
        .unwrap();

    assert!(app.manager.authenticate(&phone.access_token).await.is_err());
    assert!(app.manager.authenticate(&laptop.access_token).await.is_ok());
    assert!(app.manager.refresh(&laptop.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_rejections_are_generic() {
    let app = TestApp::new().await;
    for bearer in ["", "Bearer garbage", "a.b.c"] {
        let err = app.manager.authenticate(bearer).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Authentication failed");
    }
}
