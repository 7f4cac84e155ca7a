use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::outbound::OutboundQueue;

/// Translation direction of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageMode {
    HiToEn,
    EnToHi,
}

impl LanguageMode {
    pub fn source(&self) -> &'static str {
        match self {
            LanguageMode::HiToEn => "hi",
            LanguageMode::EnToHi => "en",
        }
    }

    pub fn target(&self) -> &'static str {
        match self {
            LanguageMode::HiToEn => "en",
            LanguageMode::EnToHi => "hi",
        }
    }
}

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// One authenticated connection to one room.
///
/// Shared between the inbound receive task, the outbound writer task and the
/// hub; all mutable pieces are independently synchronized so no task ever
/// reads another task's fields unguarded.
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub room_code: String,
    pub outbound: Arc<OutboundQueue>,
    mode: Mutex<LanguageMode>,
    state: AtomicU8,
    chunk_seq: AtomicU64,
    last_activity_ms: AtomicI64,
}

impl Session {
    pub fn new(
        user_id: Uuid,
        username: String,
        room_code: String,
        mode: LanguageMode,
        outbound: Arc<OutboundQueue>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            room_code,
            outbound,
            mode: Mutex::new(mode),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            chunk_seq: AtomicU64::new(0),
            last_activity_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        })
    }

    pub fn mode(&self) -> LanguageMode {
        *self.mode.lock()
    }

    pub fn set_mode(&self, mode: LanguageMode) {
        *self.mode.lock() = mode;
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Advances the lifecycle. Transitions out of `Closed` are refused, as
    /// are transitions backwards (e.g. `Closing -> Open`).
    pub fn transition_to(&self, next: ConnectionState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if next as u8 <= current {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Monotone per-session sequence number for the next audio chunk.
    pub fn next_chunk_seq(&self) -> u64 {
        self.chunk_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records frame activity (inbound or outbound) for the idle watchdog.
    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        let elapsed_ms = (Utc::now().timestamp_millis() - last).max(0) as u64;
        Duration::from_millis(elapsed_ms)
    }
}
