use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest id a Notion number property holds exactly.
pub const MAX_USER_ID: u64 = 1 << 53;

/// A registered user as listed from the remote store.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque record identifier assigned by the store.
    pub id: String,
    pub user_id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub created_time: String,
}

impl User {
    #[cfg(test)]
    pub fn new(
        id: impl Into<String>,
        user_id: u64,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id,
            name: name.into(),
            email: email.into(),
            created_time: String::new(),
        }
    }

    /// Key used to decide which of several records claiming the same
    /// `user_id` keeps it.
    pub fn claim_order(&self) -> (&str, &str) {
        (&self.created_time, &self.id)
    }
}

/// The fields written for a new record.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewUser {
    pub user_id: u64,
    pub name: String,
    pub email: String,
}

/// A record created by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedUser {
    pub id: String,
    pub user_id: u64,
    /// The store's raw response to the create request, passed on to API
    /// clients.
    pub raw: serde_json::Value,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("No user id left after {0}")]
pub struct IdsExhausted(pub u64);

/// Next sequential id: one past the highest existing id, or 1 when empty.
pub fn next_user_id(users: &[User]) -> Result<u64, IdsExhausted> {
    match users.iter().map(|u| u.user_id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .filter(|&next| next <= MAX_USER_ID)
            .ok_or(IdsExhausted(max)),
    }
}
