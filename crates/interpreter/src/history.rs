use std::collections::VecDeque;

use dashmap::DashMap;

use crate::TranslationResult;

/// Bounded ring of recent translation results per room, serving the room
/// messages endpoint. Purely in-memory; dropped with the room.
pub struct TranscriptHistory {
    rooms: DashMap<String, VecDeque<TranslationResult>>,
    limit: usize,
}

impl TranscriptHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            limit,
        }
    }

    pub fn push(&self, result: TranslationResult) {
        let mut entries = self.rooms.entry(result.room_code.clone()).or_default();
        entries.push_back(result);
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    /// Recent results for a room, oldest first.
    pub fn recent(&self, room_code: &str) -> Vec<TranslationResult> {
        self.rooms
            .get(room_code)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, room_code: &str) {
        self.rooms.remove(room_code);
    }
}
