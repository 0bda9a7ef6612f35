use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::{next_user_id, CreatedUser, NewUser, User};

pub use notion::NotionStore;

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory;
mod notion;

/// Adapter errors, always carrying the fixed prefix the view shows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to fetch users: {0}")]
    Query(String),
    #[error("Failed to create user: {0}")]
    Write(String),
}

impl StoreError {
    pub fn operation(&self) -> &'static str {
        match self {
            StoreError::Query(_) => "query",
            StoreError::Write(_) => "write",
        }
    }
}

/// A collection of user records held by a remote store.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    /// All records, ascending by `user_id`.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn insert_user(&self, user: &NewUser) -> Result<CreatedUser, StoreError>;

    /// Overwrites the `user_id` of the record `id`.
    async fn renumber_user(&self, id: &str, user_id: u64) -> Result<(), StoreError>;
}

/// Reads the whole collection, then writes a record numbered one past the
/// current maximum. The read and the write are not atomic.
pub async fn create_user<S: UserStore + ?Sized>(
    store: &S,
    name: &str,
    email: &str,
) -> Result<CreatedUser, StoreError> {
    let users = store.list_users().await?;
    let user = NewUser {
        user_id: next_user_id(&users).map_err(|e| StoreError::Write(e.to_string()))?,
        name: name.to_string(),
        email: email.to_string(),
    };
    debug!("Creating user {} after reading {} users", user.user_id, users.len());
    store.insert_user(&user).await
}
