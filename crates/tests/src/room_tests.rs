use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn create_room_generates_shareable_code() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("asha").await;

    let room = app
        .create_room(&owner.access_token, "Hindi Standup", None)
        .await;

    let code = room["code"].as_str().unwrap();
    assert_eq!(code.len(), 9); // XXXX-XXXX
    assert_eq!(&code[4..5], "-");
    assert_eq!(room["name"], "Hindi Standup");
    assert_eq!(room["capacity"], 10);
    assert_eq!(room["status"], "active");
    assert_eq!(room["participant_count"], 0);
    assert_eq!(room["owner_id"], owner.id);
}

#[tokio::test]
async fn create_room_with_explicit_capacity() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("asha").await;

    let room = app.create_room(&owner.access_token, "Huddle", Some(2)).await;
    assert_eq!(room["capacity"], 2);
}

#[tokio::test]
async fn join_and_list_rooms() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("asha").await;
    let guest = app.register_user("bilal").await;

    let room = app.create_room(&owner.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/room/{code}/join"), &guest.access_token)
        .json(&serde_json::json!({ "language_mode": "en_to_hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/room", &guest.access_token)
        .send()
        .await
        .unwrap();
    let rooms: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["code"], code);

    // The owner auto-joined at creation.
    let resp = app
        .auth_get("/api/room", &owner.access_token)
        .send()
        .await
        .unwrap();
    let rooms: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(rooms.len(), 1);
}

#[tokio::test]
async fn get_unknown_room_is_not_found() {
    let app = TestApp::spawn().await;
    let user = app.register_user("asha").await;

    let resp = app
        .auth_get("/api/room/ZZZZ-ZZZZ", &user.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn only_the_owner_can_end_a_room() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("asha").await;
    let guest = app.register_user("bilal").await;

    let room = app.create_room(&owner.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/room/{code}/end"), &guest.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(&format!("/api/room/{code}/end"), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["ended"], true);

    // Ended rooms admit no one.
    let resp = app
        .auth_post(&format!("/api/room/{code}/join"), &guest.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 410);
}

#[tokio::test]
async fn messages_require_membership() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("asha").await;
    let outsider = app.register_user("mallory").await;

    let room = app.create_room(&owner.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let resp = app
        .auth_get(&format!("/api/room/{code}/message"), &outsider.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get(&format!("/api/room/{code}/message"), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let messages: Vec<Value> = resp.json().await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn room_routes_require_auth() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/room")
        .json(&serde_json::json!({ "name": "Standup" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}
