use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn register_login_me_flow() {
    let app = TestApp::spawn().await;

    let user = app.register_user("asha").await;
    assert!(!user.access_token.is_empty());

    // Fresh login issues a usable token.
    let resp = app
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "asha",
            "password": "password-123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let token = json["access_token"].as_str().unwrap();
    assert_eq!(json["token_type"], "bearer");

    let resp = app.auth_get("/api/auth/me", token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["username"], "asha");
    assert_eq!(json["email"], "asha@example.com");
    assert_eq!(json["id"], user.id);
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let app = TestApp::spawn().await;
    app.register_user("asha").await;

    let resp = app
        .post("/api/auth/register")
        .json(&serde_json::json!({
            "username": "asha",
            "email": "other@example.com",
            "password": "password-456",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.register_user("asha").await;

    let resp = app
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "asha",
            "password": "not-the-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // Unknown user gets the same answer as a bad password.
    let resp = app
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "nobody",
            "password": "password-123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/auth/register")
        .json(&serde_json::json!({
            "username": "ok",
            "email": "not-an-email",
            "password": "short",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn me_requires_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .auth_get("/api/auth/me", "garbage-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}
