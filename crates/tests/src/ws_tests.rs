use std::time::Duration;

use futures::SinkExt;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::fixtures::fake_adapters::audio_payload;
use crate::fixtures::test_app::{TestApp, WsClient, expect_close, expect_event, expect_silence};

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

async fn send_audio(ws: &mut WsClient, text: &str, lang: &str, confidence: f64) {
    ws.send(Message::binary(audio_payload(text, lang, confidence)))
        .await
        .unwrap();
}

/// The §8-style walkthrough: join, join, speak, change mode, leave.
#[tokio::test]
async fn full_meeting_scenario() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let bilal = app.register_user("bilal").await;

    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    // A joins and hears about itself.
    let mut a = app.connect_ws(code, &asha.access_token).await;
    let established = expect_event(&mut a, "connection_established").await;
    assert_eq!(established["room_code"], *code);
    assert_eq!(established["user_id"], asha.id);
    assert_eq!(established["language_mode"], "hi_to_en");
    assert_eq!(established["participants"].as_array().unwrap().len(), 1);
    let joined = expect_event(&mut a, "user_joined").await;
    assert_eq!(joined["participants"].as_array().unwrap().len(), 1);

    // B joins; both sides observe two participants.
    let mut b = app.connect_ws(code, &bilal.access_token).await;
    let established = expect_event(&mut b, "connection_established").await;
    assert_eq!(established["participants"].as_array().unwrap().len(), 2);
    let joined = expect_event(&mut b, "user_joined").await;
    assert_eq!(joined["username"], "bilal");

    let joined = expect_event(&mut a, "user_joined").await;
    assert_eq!(joined["username"], "bilal");
    assert_eq!(joined["participants"].as_array().unwrap().len(), 2);

    // A speaks Hindi; everyone (speaker included) gets the result.
    send_audio(&mut a, "नमस्ते", "hi", 0.9).await;
    for ws in [&mut a, &mut b] {
        let result = expect_event(ws, "translation_result").await;
        assert_eq!(result["user_id"], asha.id);
        assert_eq!(result["username"], "asha");
        assert_eq!(result["original_text"], "नमस्ते");
        assert_eq!(result["translated_text"], "Hello");
        assert_eq!(result["source_language"], "hi");
        assert_eq!(result["target_language"], "en");
        assert_eq!(result["audio_url"], "/static/audio/test-fixture.mp3");
        assert_eq!(result["confidence"], 0.9);
        assert_eq!(result["degraded"], false);
    }

    // B flips direction; the whole room sees the refreshed snapshot.
    send_json(&mut b, serde_json::json!({ "type": "change_mode", "mode": "en_to_hi" })).await;
    for ws in [&mut a, &mut b] {
        let changed = expect_event(ws, "mode_changed").await;
        assert_eq!(changed["mode"], "en_to_hi");
        assert_eq!(changed["user_id"], bilal.id);
        let participants = changed["participants"].as_array().unwrap();
        let row = participants
            .iter()
            .find(|p| p["user_id"] == bilal.id)
            .unwrap();
        assert_eq!(row["language_mode"], "en_to_hi");
    }

    // A hangs up; B sees one participant remain.
    a.close(None).await.unwrap();
    let left = expect_event(&mut b, "user_left").await;
    assert_eq!(left["username"], "asha");
    assert_eq!(left["participants"].as_array().unwrap().len(), 1);

    // The exchange landed in the room transcript.
    let resp = app
        .auth_get(&format!("/api/room/{code}/message"), &asha.access_token)
        .send()
        .await
        .unwrap();
    let messages: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["original_text"], "नमस्ते");
}

#[tokio::test]
async fn pong_goes_only_to_the_requester() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let bilal = app.register_user("bilal").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;
    let mut b = app.connect_ws(code, &bilal.access_token).await;
    expect_event(&mut b, "connection_established").await;
    expect_event(&mut b, "user_joined").await;
    expect_event(&mut a, "user_joined").await;

    send_json(&mut a, serde_json::json!({ "type": "ping" })).await;

    expect_event(&mut a, "pong").await;
    expect_silence(&mut b, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn reconnect_replaces_the_prior_session() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut first = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut first, "connection_established").await;
    expect_event(&mut first, "user_joined").await;

    let mut second = app.connect_ws(code, &asha.access_token).await;
    let established = expect_event(&mut second, "connection_established").await;
    // Never two live sessions for one user in one room.
    assert_eq!(established["participants"].as_array().unwrap().len(), 1);
    expect_event(&mut second, "user_joined").await;

    // The superseded connection is closed by the server.
    expect_close(&mut first).await;

    let resp = app
        .auth_get(&format!("/api/room/{code}/participant"), &asha.access_token)
        .send()
        .await
        .unwrap();
    let participants: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(participants.len(), 1);

    // The replacement session is fully live.
    send_json(&mut second, serde_json::json!({ "type": "ping" })).await;
    expect_event(&mut second, "pong").await;
}

#[tokio::test]
async fn handshake_rejects_bad_token_and_bad_room() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    // Invalid token: refused before the upgrade.
    match connect_async(app.ws_url(code, "garbage-token")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected HTTP 401 rejection, got {other:?}"),
    }

    // Unknown room.
    match connect_async(app.ws_url("ZZZZ-ZZZZ", &asha.access_token)).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 404),
        other => panic!("expected HTTP 404 rejection, got {other:?}"),
    }

    // Ended room.
    app.auth_post(&format!("/api/room/{code}/end"), &asha.access_token)
        .send()
        .await
        .unwrap();
    match connect_async(app.ws_url(code, &asha.access_token)).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 410),
        other => panic!("expected HTTP 410 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn full_room_is_refused_with_close_code() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let bilal = app.register_user("bilal").await;
    let room = app
        .create_room(&asha.access_token, "Tiny Huddle", Some(1))
        .await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;

    let mut b = app.connect_ws(code, &bilal.access_token).await;
    assert_eq!(expect_close(&mut b).await, Some(4003));

    // The resident session is unaffected.
    send_json(&mut a, serde_json::json!({ "type": "ping" })).await;
    expect_event(&mut a, "user_joined").await;
    expect_event(&mut a, "pong").await;
}

#[tokio::test]
async fn unknown_and_malformed_control_frames_are_ignored() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    send_json(&mut a, serde_json::json!({ "type": "selfie", "pose": 3 })).await;
    a.send(Message::text("this is not json")).await.unwrap();
    expect_silence(&mut a, Duration::from_millis(300)).await;

    // Still alive and responsive.
    send_json(&mut a, serde_json::json!({ "type": "ping" })).await;
    expect_event(&mut a, "pong").await;
}

#[tokio::test]
async fn subthreshold_chunks_produce_no_events() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    // Below the minimum chunk size: trailing recorder silence.
    a.send(Message::binary(vec![0u8; 4])).await.unwrap();
    // Valid size, but transcribes to nothing.
    a.send(Message::binary(vec![0u8; 32])).await.unwrap();
    // Recognized speech under the confidence floor.
    send_audio(&mut a, "mumble", "hi", 0.1).await;

    expect_silence(&mut a, Duration::from_millis(400)).await;
}

#[tokio::test]
async fn translation_failure_degrades_but_still_broadcasts() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    send_audio(&mut a, "शुभ FAIL_TRANSLATE", "hi", 0.9).await;

    let result = expect_event(&mut a, "translation_result").await;
    assert_eq!(result["degraded"], true);
    assert_eq!(result["translated_text"], result["original_text"]);
    // Synthesis still ran on the passed-through text.
    assert_eq!(result["audio_url"], "/static/audio/test-fixture.mp3");
}

#[tokio::test]
async fn synthesis_failure_yields_text_only_result() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    // Confidently detected English overrides the hi→en mode's source.
    send_audio(&mut a, "hello FAIL_TTS", "en", 0.9).await;

    let result = expect_event(&mut a, "translation_result").await;
    assert_eq!(result["source_language"], "en");
    assert_eq!(result["target_language"], "hi");
    assert_eq!(result["audio_url"], Value::Null);
    assert_eq!(result["degraded"], false);
}

#[tokio::test]
async fn one_speaker_results_arrive_in_chunk_order() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    for text in ["pehla", "doosra", "teesra"] {
        send_audio(&mut a, text, "hi", 0.9).await;
    }

    for expected in ["pehla", "doosra", "teesra"] {
        let result = expect_event(&mut a, "translation_result").await;
        assert_eq!(result["original_text"], expected);
    }
}

#[tokio::test]
async fn ending_a_room_hangs_up_live_sessions() {
    let app = TestApp::spawn().await;
    let asha = app.register_user("asha").await;
    let bilal = app.register_user("bilal").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    let mut b = app.connect_ws(code, &bilal.access_token).await;
    expect_event(&mut b, "connection_established").await;

    app.auth_post(&format!("/api/room/{code}/end"), &asha.access_token)
        .send()
        .await
        .unwrap();

    expect_close(&mut a).await;
    expect_close(&mut b).await;
}

#[tokio::test]
async fn idle_sessions_are_timed_out() {
    let app = TestApp::spawn_with(|settings| {
        settings.ws.idle_timeout_secs = 2;
    })
    .await;
    let asha = app.register_user("asha").await;
    let room = app.create_room(&asha.access_token, "Standup", None).await;
    let code = room["code"].as_str().unwrap();

    let mut a = app.connect_ws(code, &asha.access_token).await;
    expect_event(&mut a, "connection_established").await;
    expect_event(&mut a, "user_joined").await;

    // No frames in either direction: the supervisor hangs up on its own.
    expect_close(&mut a).await;
}
