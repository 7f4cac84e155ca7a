use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username already taken")]
    DuplicateUsername,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory user store. Reference implementation of the user-persistence
/// collaborator; lookups are by ID (token subjects) or username (login).
pub struct UserRegistry {
    by_id: DashMap<Uuid, User>,
    by_username: DashMap<String, Uuid>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_username: DashMap::new(),
        }
    }

    pub fn register(
        &self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<User, UserError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.clone(),
            email,
            password_hash,
            created_at: Utc::now(),
        };

        // The username entry is the uniqueness gate; insert it first so two
        // concurrent registrations cannot both claim the same name.
        match self.by_username.entry(username) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(UserError::DuplicateUsername),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.by_id.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.by_id.get(&id).map(|u| u.clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<User> {
        let id = *self.by_username.get(username)?;
        self.find_by_id(id)
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
