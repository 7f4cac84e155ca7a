pub mod events;
pub mod outbound;
pub mod presence;
pub mod session;

pub use events::{ClientMessage, ParticipantInfo, ServerEvent};
pub use outbound::OutboundQueue;
pub use session::{ConnectionState, LanguageMode, Session};

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use sabha_config::WsSettings;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("room is at capacity")]
    RoomFull,
}

/// Result of a successful registration.
pub struct RegisterOutcome {
    /// Presence as of the moment the session was admitted.
    pub snapshot: Vec<ParticipantInfo>,
    /// Prior session of the same user in the same room, superseded by this
    /// registration. Its outbound queue is already closed; the caller still
    /// owns cancelling its pipeline work.
    pub replaced: Option<Arc<Session>>,
}

struct RoomState {
    sessions: RwLock<Vec<Arc<Session>>>,
}

/// Per-room session registry and broadcast fan-out.
///
/// State is owned per room: one room's registration or broadcast never
/// touches another room's lock. Delivery goes through each session's bounded
/// outbound queue, so a slow or dead peer cannot stall the room.
pub struct RoomHub {
    rooms: DashMap<String, Arc<RoomState>>,
    outbound_capacity: usize,
}

impl RoomHub {
    pub fn new(settings: &WsSettings) -> Self {
        Self {
            rooms: DashMap::new(),
            outbound_capacity: settings.outbound_queue_capacity,
        }
    }

    /// Builds a session wired to a fresh outbound queue sized for this hub.
    pub fn create_session(
        &self,
        user_id: Uuid,
        username: String,
        room_code: String,
        mode: LanguageMode,
    ) -> Arc<Session> {
        let queue = Arc::new(OutboundQueue::new(self.outbound_capacity));
        Session::new(user_id, username, room_code, mode, queue)
    }

    /// Admits a session into its room and broadcasts the new presence.
    ///
    /// If the user already holds an open session in the room, that session is
    /// superseded (closed and returned) instead of counting against capacity:
    /// a reconnect must never double-count its user or get refused by its own
    /// ghost.
    pub fn register(
        &self,
        session: Arc<Session>,
        capacity: u32,
    ) -> Result<RegisterOutcome, HubError> {
        let room = self
            .rooms
            .entry(session.room_code.clone())
            .or_insert_with(|| {
                Arc::new(RoomState {
                    sessions: RwLock::new(Vec::new()),
                })
            })
            .clone();

        let (snapshot, replaced) = {
            let mut sessions = room.sessions.write();

            let replaced = sessions
                .iter()
                .position(|s| s.user_id == session.user_id)
                .map(|idx| sessions.remove(idx));

            if replaced.is_none() && sessions.len() as u32 >= capacity {
                drop(sessions);
                self.discard_if_empty(&session.room_code);
                return Err(HubError::RoomFull);
            }

            session.transition_to(ConnectionState::Open);
            sessions.push(session.clone());
            (presence::snapshot(&sessions), replaced)
        };

        if let Some(old) = &replaced {
            old.transition_to(ConnectionState::Closing);
            old.outbound.close();
            info!(
                room = %session.room_code,
                user = %session.user_id,
                old_session = %old.id,
                "Reconnect superseded prior session"
            );
        }

        info!(
            room = %session.room_code,
            user = %session.user_id,
            username = %session.username,
            total = snapshot.len(),
            "Session registered"
        );

        // The admitted session hears about itself first, then the room-wide
        // join like everyone else.
        session.outbound.push(ServerEvent::ConnectionEstablished {
            user_id: session.user_id,
            username: session.username.clone(),
            room_code: session.room_code.clone(),
            language_mode: session.mode(),
            participants: snapshot.clone(),
        });

        self.broadcast(
            &session.room_code,
            ServerEvent::UserJoined {
                user_id: session.user_id,
                username: session.username.clone(),
                participants: snapshot.clone(),
            },
        );

        Ok(RegisterOutcome { snapshot, replaced })
    }

    /// Removes a session. Idempotent: unregistering an already-removed
    /// session is a no-op and emits nothing. An emptied room's state is
    /// discarded without a `user_left` broadcast.
    pub fn unregister(&self, session: &Arc<Session>) -> bool {
        let Some(room) = self.rooms.get(&session.room_code).map(|r| r.clone()) else {
            return false;
        };

        let removed_snapshot = {
            let mut sessions = room.sessions.write();
            let before = sessions.len();
            sessions.retain(|s| s.id != session.id);
            if sessions.len() == before {
                None
            } else {
                Some(presence::snapshot(&sessions))
            }
        };

        let Some(snapshot) = removed_snapshot else {
            return false;
        };

        session.transition_to(ConnectionState::Closing);
        session.transition_to(ConnectionState::Closed);
        session.outbound.close();

        if snapshot.is_empty() {
            self.discard_if_empty(&session.room_code);
            debug!(room = %session.room_code, "Room emptied, state discarded");
        } else {
            self.broadcast(
                &session.room_code,
                ServerEvent::UserLeft {
                    user_id: session.user_id,
                    username: session.username.clone(),
                    participants: snapshot,
                },
            );
        }

        info!(
            room = %session.room_code,
            user = %session.user_id,
            session = %session.id,
            "Session unregistered"
        );
        true
    }

    /// Delivers an event to every registered session's outbound queue in the
    /// room, including the originator. Queue pushes never block; a full
    /// queue applies the per-session drop policy without affecting peers.
    pub fn broadcast(&self, room_code: &str, event: ServerEvent) {
        let Some(room) = self.rooms.get(room_code).map(|r| r.clone()) else {
            return;
        };
        let targets: Vec<Arc<Session>> = room.sessions.read().iter().cloned().collect();
        for session in targets {
            session.outbound.push(event.clone());
        }
    }

    /// Delivers an event to a single session only.
    pub fn send_to(&self, session: &Session, event: ServerEvent) {
        session.outbound.push(event);
    }

    /// Mutates one session's translation mode and broadcasts the refreshed
    /// snapshot.
    pub fn change_mode(&self, session: &Arc<Session>, mode: LanguageMode) {
        session.set_mode(mode);
        let participants = self.snapshot(&session.room_code);
        info!(
            room = %session.room_code,
            user = %session.user_id,
            ?mode,
            "Mode changed"
        );
        self.broadcast(
            &session.room_code,
            ServerEvent::ModeChanged {
                user_id: session.user_id,
                mode,
                participants,
            },
        );
    }

    /// Tears a room down (room ended): every session's queue is closed so
    /// its writer task drains and hangs up, and the in-memory state is
    /// discarded.
    pub fn close_room(&self, room_code: &str) {
        let Some((_, room)) = self.rooms.remove(room_code) else {
            return;
        };
        let sessions: Vec<Arc<Session>> = room.sessions.read().iter().cloned().collect();
        for session in &sessions {
            session.transition_to(ConnectionState::Closing);
            session.outbound.close();
        }
        info!(room = %room_code, sessions = sessions.len(), "Room closed");
    }

    pub fn snapshot(&self, room_code: &str) -> Vec<ParticipantInfo> {
        self.rooms
            .get(room_code)
            .map(|room| presence::snapshot(&room.sessions.read()))
            .unwrap_or_default()
    }

    pub fn is_registered(&self, room_code: &str, session_id: Uuid) -> bool {
        self.rooms
            .get(room_code)
            .map(|room| room.sessions.read().iter().any(|s| s.id == session_id))
            .unwrap_or(false)
    }

    pub fn session_count(&self, room_code: &str) -> usize {
        self.rooms
            .get(room_code)
            .map(|room| room.sessions.read().len())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.rooms
            .iter()
            .map(|room| room.sessions.read().len())
            .sum()
    }

    fn discard_if_empty(&self, room_code: &str) {
        self.rooms
            .remove_if(room_code, |_, room| room.sessions.read().is_empty());
    }
}
