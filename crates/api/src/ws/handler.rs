use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::state::AppState;
use sabha_interpreter::AudioChunk;
use sabha_services::auth::{AuthenticatedUser, TokenVerifier};
use sabha_services::directory::{RoomDirectory, RoomError, RoomStatus};
use sabha_services::hub::{ClientMessage, ConnectionState, HubError, ServerEvent, Session};

/// Close code for a room that vanished or ended between the pre-upgrade
/// lookup and registration.
const CLOSE_ROOM_GONE: u16 = 4002;
/// Close code sent when the capacity re-check under the room lock loses the
/// race that the pre-upgrade lookup could not see.
const CLOSE_ROOM_FULL: u16 = 4003;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// `GET /ws/{room_code}?token=...`
///
/// Token and room are validated before the upgrade: a bad token fails the
/// handshake with 401, an unknown or ended room with 404/410. Capacity is
/// only provisionally known here; `RoomHub::register` re-checks it under the
/// room lock once the socket is up.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(room_code): Path<String>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match state.auth.validate_token(&params.token) {
        Ok(identity) => identity,
        Err(_) => {
            return Response::builder()
                .status(401)
                .body("Unauthorized".into())
                .unwrap();
        }
    };

    if let Err(e) = state.rooms.is_member_eligible(&room_code, identity.user_id) {
        let (status, reason) = match e {
            RoomError::NotFound => (404, "Room not found"),
            RoomError::Ended => (410, "Room has ended"),
            _ => (403, "Not eligible to join"),
        };
        return Response::builder()
            .status(status)
            .body(reason.into())
            .unwrap();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity, room_code))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    identity: AuthenticatedUser,
    room_code: String,
) {
    let AuthenticatedUser { user_id, username } = identity;
    let mode = state.rooms.member_mode(&room_code, user_id);
    let session = state
        .hub
        .create_session(user_id, username, room_code.clone(), mode);

    info!(
        session = %session.id,
        user = %session.user_id,
        username = %session.username,
        room = %room_code,
        "WebSocket connected"
    );

    let (mut sender, mut receiver) = socket.split();

    // Re-check the room now that the socket is up: it may have ended while
    // the upgrade was in flight.
    let capacity = match state.rooms.lookup_room(&room_code) {
        Ok(info) if info.status == RoomStatus::Active => info.capacity,
        _ => {
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_ROOM_GONE,
                    reason: "Room not found or ended".into(),
                })))
                .await;
            return;
        }
    };

    let outcome = match state.hub.register(session.clone(), capacity) {
        Ok(outcome) => outcome,
        Err(HubError::RoomFull) => {
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_ROOM_FULL,
                    reason: "Room is full".into(),
                })))
                .await;
            return;
        }
    };

    // A superseded session's pipeline dies with it; its own supervisor task
    // handles the rest of the teardown when its queue closes.
    if let Some(old) = &outcome.replaced {
        state.engine.stop_session(old.id);
    }

    state.engine.start_session(
        session.id,
        session.user_id,
        session.username.clone(),
        room_code.clone(),
    );

    // Outbound writer: the only task touching the sink. Drains the session
    // queue until the hub closes it or the socket dies.
    let writer_session = session.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = writer_session.outbound.pop().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if sender.send(Message::text(text)).await.is_err() {
                break;
            }
            writer_session.touch();
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let idle_timeout = Duration::from_secs(state.settings.ws.idle_timeout_secs);
    let check_interval = std::cmp::max(idle_timeout / 4, Duration::from_secs(1));

    loop {
        match tokio::time::timeout(check_interval, receiver.next()).await {
            Err(_) => {
                if session.idle_for() >= idle_timeout {
                    info!(session = %session.id, "Idle timeout, closing session");
                    break;
                }
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!(session = %session.id, %e, "WebSocket error");
                break;
            }
            Ok(Some(Ok(message))) => {
                session.touch();
                match message {
                    Message::Binary(data) => {
                        // Sequence and hand off without waiting on the
                        // pipeline; the engine's buffer absorbs or drops.
                        let seq = session.next_chunk_seq();
                        let mode = session.mode();
                        state.engine.submit_chunk(
                            session.id,
                            AudioChunk {
                                seq,
                                bytes: data.to_vec(),
                                source_language: mode.source().to_string(),
                                target_language: mode.target().to_string(),
                            },
                        );
                    }
                    Message::Text(text) => handle_control_message(&state, &session, &text),
                    Message::Close(_) => break,
                    // Transport-level ping/pong counts as activity only.
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    }

    // Teardown is idempotent whichever path got here first: the hub ignores
    // a second unregister and the engine a second stop.
    session.outbound.close();
    state.engine.stop_session(session.id);
    state.hub.unregister(&session);
    session.transition_to(ConnectionState::Closed);
    let _ = writer.await;

    info!(
        session = %session.id,
        user = %session.user_id,
        room = %room_code,
        "WebSocket disconnected"
    );
}

fn handle_control_message(state: &AppState, session: &Arc<Session>, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(session = %session.id, %e, "Malformed control frame ignored");
            return;
        }
    };

    match message {
        ClientMessage::ChangeMode { mode } => {
            state.hub.change_mode(session, mode);
        }
        ClientMessage::Ping => {
            // To the requester only, never broadcast.
            state.hub.send_to(session, ServerEvent::Pong);
        }
        ClientMessage::Unknown => {
            debug!(session = %session.id, "Unknown control type ignored");
        }
    }
}
