use std::sync::Arc;

use super::events::ParticipantInfo;
use super::session::Session;

/// Rebuilds the presence view from the live session list. Always derived,
/// never stored, so reported presence cannot drift from hub membership.
/// Order is room join order.
pub fn snapshot(sessions: &[Arc<Session>]) -> Vec<ParticipantInfo> {
    sessions
        .iter()
        .map(|s| ParticipantInfo {
            user_id: s.user_id,
            username: s.username.clone(),
            language_mode: s.mode(),
        })
        .collect()
}
