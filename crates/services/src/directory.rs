use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::hub::LanguageMode;
use sabha_config::RoomSettings;

const CODE_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("room has ended")]
    Ended,
    #[error("room is full")]
    Full,
    #[error("not the room owner")]
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Ended,
}

#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub code: String,
    pub name: String,
    pub owner_id: Uuid,
    pub capacity: u32,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// What the session hub needs to know about a room before admitting a
/// connection.
#[derive(Debug, Clone, Copy)]
pub struct RoomInfo {
    pub capacity: u32,
    pub status: RoomStatus,
}

/// Room-directory collaborator consumed by the connection supervisor.
pub trait RoomDirectory: Send + Sync {
    fn lookup_room(&self, code: &str) -> Result<RoomInfo, RoomError>;
    fn is_member_eligible(&self, code: &str, user_id: Uuid) -> Result<(), RoomError>;
}

#[derive(Debug, Clone)]
struct Membership {
    user_id: Uuid,
    mode: LanguageMode,
}

/// In-memory room directory. Reference implementation of the
/// room-persistence collaborator: rooms, loose membership (join order
/// preserved) and the member's initially requested translation mode.
///
/// Live-session capacity is NOT enforced here; only `RoomHub::register`
/// holds the room lock where the live count is race-free.
pub struct InMemoryRoomDirectory {
    rooms: DashMap<String, RoomRecord>,
    members: DashMap<String, Vec<Membership>>,
    code_length: usize,
    default_capacity: u32,
}

impl InMemoryRoomDirectory {
    pub fn new(settings: &RoomSettings) -> Self {
        Self {
            rooms: DashMap::new(),
            members: DashMap::new(),
            code_length: settings.code_length,
            default_capacity: settings.default_capacity,
        }
    }

    /// Creates a room with a fresh shareable code; the owner auto-joins.
    pub fn create_room(
        &self,
        owner_id: Uuid,
        name: String,
        capacity: Option<u32>,
        mode: LanguageMode,
    ) -> RoomRecord {
        let code = loop {
            let candidate = generate_room_code(self.code_length);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = RoomRecord {
            code: code.clone(),
            name,
            owner_id,
            capacity: capacity.unwrap_or(self.default_capacity),
            status: RoomStatus::Active,
            created_at: Utc::now(),
            ended_at: None,
        };
        self.rooms.insert(code.clone(), room.clone());
        self.members
            .insert(code.clone(), vec![Membership { user_id: owner_id, mode }]);

        info!(%code, owner = %owner_id, "Room created");
        room
    }

    pub fn find(&self, code: &str) -> Result<RoomRecord, RoomError> {
        self.rooms
            .get(code)
            .map(|r| r.clone())
            .ok_or(RoomError::NotFound)
    }

    /// Records membership (idempotent) and the member's requested mode.
    pub fn join(&self, code: &str, user_id: Uuid, mode: LanguageMode) -> Result<RoomRecord, RoomError> {
        let room = self.find(code)?;
        if room.status == RoomStatus::Ended {
            return Err(RoomError::Ended);
        }

        let mut members = self.members.entry(code.to_string()).or_default();
        match members.iter_mut().find(|m| m.user_id == user_id) {
            Some(existing) => existing.mode = mode,
            None => members.push(Membership { user_id, mode }),
        }

        Ok(room)
    }

    pub fn leave(&self, code: &str, user_id: Uuid) -> Result<(), RoomError> {
        self.find(code)?;
        if let Some(mut members) = self.members.get_mut(code) {
            members.retain(|m| m.user_id != user_id);
        }
        Ok(())
    }

    pub fn is_member(&self, code: &str, user_id: Uuid) -> bool {
        self.members
            .get(code)
            .map(|members| members.iter().any(|m| m.user_id == user_id))
            .unwrap_or(false)
    }

    /// The mode the member asked for when joining, falling back to the
    /// bilingual default for users who connected without a REST join.
    pub fn member_mode(&self, code: &str, user_id: Uuid) -> LanguageMode {
        self.members
            .get(code)
            .and_then(|members| {
                members
                    .iter()
                    .find(|m| m.user_id == user_id)
                    .map(|m| m.mode)
            })
            .unwrap_or(LanguageMode::HiToEn)
    }

    /// Ends the room. Only the owner may end it; ending is idempotent.
    pub fn end_room(&self, code: &str, by_user: Uuid) -> Result<RoomRecord, RoomError> {
        let mut room = self.rooms.get_mut(code).ok_or(RoomError::NotFound)?;
        if room.owner_id != by_user {
            return Err(RoomError::Forbidden);
        }
        if room.status == RoomStatus::Active {
            room.status = RoomStatus::Ended;
            room.ended_at = Some(Utc::now());
            info!(%code, "Room ended");
        }
        Ok(room.clone())
    }

    pub fn rooms_for_user(&self, user_id: Uuid) -> Vec<RoomRecord> {
        let mut rooms: Vec<RoomRecord> = self
            .members
            .iter()
            .filter(|entry| entry.value().iter().any(|m| m.user_id == user_id))
            .filter_map(|entry| self.rooms.get(entry.key()).map(|r| r.clone()))
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rooms
    }
}

impl RoomDirectory for InMemoryRoomDirectory {
    fn lookup_room(&self, code: &str) -> Result<RoomInfo, RoomError> {
        let room = self.find(code)?;
        Ok(RoomInfo {
            capacity: room.capacity,
            status: room.status,
        })
    }

    fn is_member_eligible(&self, code: &str, _user_id: Uuid) -> Result<(), RoomError> {
        let room = self.find(code)?;
        match room.status {
            RoomStatus::Active => Ok(()),
            RoomStatus::Ended => Err(RoomError::Ended),
        }
    }
}

fn generate_room_code(length: usize) -> String {
    let raw = nanoid::nanoid!(length, &CODE_ALPHABET);
    let half = length / 2;
    format!("{}-{}", &raw[..half], &raw[half..])
}
