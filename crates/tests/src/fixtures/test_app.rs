use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::fake_adapters::{ScriptedStt, ScriptedTranslate, ScriptedTts};
use sabha_api::state::AppState;
use sabha_api::{build_router, ws};
use sabha_config::Settings;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestUser {
    pub id: String,
    pub username: String,
    pub access_token: String,
}

/// A full server on a random port, backed by scripted interpretation
/// engines and `pcm16` chunk encoding.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "test-secret".to_string();
        settings.interpreter.encoding = "pcm16".to_string();
        settings.interpreter.min_chunk_bytes = 16;
        customize(&mut settings);

        let (state, result_rx) = AppState::build(
            settings,
            Arc::new(ScriptedStt),
            Arc::new(ScriptedTranslate),
            Arc::new(ScriptedTts),
        );
        ws::forwarder::spawn(state.clone(), result_rx);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, room_code: &str, token: &str) -> String {
        format!("ws://{}/ws/{}?token={}", self.addr, room_code, token)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub async fn register_user(&self, username: &str) -> TestUser {
        let resp = self
            .post("/api/auth/register")
            .json(&serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "password-123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "register failed for {username}");

        let json: Value = resp.json().await.unwrap();
        TestUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn create_room(&self, token: &str, name: &str, capacity: Option<u32>) -> Value {
        let mut body = serde_json::json!({ "name": name });
        if let Some(capacity) = capacity {
            body["max_participants"] = serde_json::json!(capacity);
        }

        let resp = self
            .auth_post("/api/room", token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "room creation failed");
        resp.json().await.unwrap()
    }

    pub async fn connect_ws(&self, room_code: &str, token: &str) -> WsClient {
        let (stream, _) = connect_async(self.ws_url(room_code, token))
            .await
            .expect("WebSocket handshake failed");
        stream
    }
}

/// Next JSON event from the socket, skipping transport frames.
pub async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a WebSocket event")
            .expect("WebSocket stream ended")
            .expect("WebSocket error");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected WebSocket frame: {other:?}"),
        }
    }
}

/// Next JSON event, asserting its `type`.
pub async fn expect_event(ws: &mut WsClient, event_type: &str) -> Value {
    let event = recv_event(ws).await;
    assert_eq!(
        event["type"], event_type,
        "expected {event_type}, got: {event}"
    );
    event
}

/// Asserts that no JSON event arrives within `window`.
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let outcome = tokio::time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => panic!("WebSocket closed while expecting silence"),
            }
        }
    })
    .await;

    if let Ok(text) = outcome {
        panic!("expected silence, got: {text}");
    }
}

/// Waits for the server to close the socket; returns the close code if the
/// peer sent a close frame.
pub async fn expect_close(ws: &mut WsClient) -> Option<u16> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for close")
        {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code.into()),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}
