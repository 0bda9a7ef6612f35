use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{StoreError, UserStore};
use crate::model::{CreatedUser, NewUser, User};

/// In-process stand-in for the remote collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    clock: AtomicUsize,
    inserts: AtomicUsize,
    queries: AtomicUsize,
    query_error: Mutex<Option<String>>,
    write_error: Mutex<Option<String>>,
    /// Written just before the next insert, as if another client won the race.
    competitor: Mutex<Option<NewUser>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[u64]) -> Self {
        let store = Self::new();
        for &user_id in ids {
            store.push(NewUser {
                user_id,
                name: format!("user {user_id}"),
                email: format!("user{user_id}@example.com"),
            });
        }
        store
    }

    pub fn fail_queries(&self, message: &str) {
        *self.query_error.lock().unwrap() = Some(message.into());
    }

    pub fn fail_writes(&self, message: &str) {
        *self.write_error.lock().unwrap() = Some(message.into());
    }

    pub fn heal(&self) {
        *self.query_error.lock().unwrap() = None;
        *self.write_error.lock().unwrap() = None;
    }

    pub fn race_next_insert(&self, user: NewUser) {
        *self.competitor.lock().unwrap() = Some(user);
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    fn push(&self, user: NewUser) -> User {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        let record = User {
            id: format!("page-{tick:04}"),
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            created_time: format!("2024-01-01T00:{:02}:{:02}.000Z", tick / 60, tick % 60),
        };
        self.users.lock().unwrap().push(record.clone());
        record
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(message) = self.query_error.lock().unwrap().clone() {
            return Err(StoreError::Query(message));
        }

        let mut users = self.snapshot();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<CreatedUser, StoreError> {
        tokio::task::yield_now().await;
        if let Some(message) = self.write_error.lock().unwrap().clone() {
            return Err(StoreError::Write(message));
        }

        let competitor = self.competitor.lock().unwrap().take();
        if let Some(competitor) = competitor {
            self.push(competitor);
        }

        self.inserts.fetch_add(1, Ordering::SeqCst);
        let record = self.push(user.clone());
        Ok(CreatedUser {
            id: record.id.clone(),
            user_id: record.user_id,
            raw: json!({"object": "page", "id": record.id}),
        })
    }

    async fn renumber_user(&self, id: &str, user_id: u64) -> Result<(), StoreError> {
        if let Some(message) = self.write_error.lock().unwrap().clone() {
            return Err(StoreError::Write(message));
        }

        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.user_id = user_id;
                Ok(())
            }
            None => Err(StoreError::Write(format!("Could not find page with ID: {id}"))),
        }
    }
}
