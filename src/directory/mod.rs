use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::model::{CreatedUser, FieldErrors, User, UserForm};
use crate::store::{self, StoreError, UserStore};

pub use reconcile::reconcile;

mod reconcile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<User>),
    Failed(String),
}

impl LoadState {
    /// The held list; empty unless loaded.
    pub fn users(&self) -> &[User] {
        match self {
            LoadState::Loaded(users) => users.as_slice(),
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Loaded(_) => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("The form has invalid fields")]
    Validation(FieldErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub created: CreatedUser,
    /// How often the new record lost a race and had to move.
    pub renumbered: usize,
}

#[derive(Debug)]
struct Tracked {
    generation: u64,
    state: LoadState,
}

/// The in-memory user list and the operations that keep it current.
#[derive(Debug, Clone)]
pub struct Directory {
    store: Arc<dyn UserStore>,
    state: Arc<RwLock<Tracked>>,
    generation: Arc<AtomicU64>,
    submissions: Arc<Mutex<()>>,
}

impl Directory {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        let tracked = Tracked {
            generation: 0,
            state: LoadState::Idle,
        };
        Self {
            store,
            state: Arc::new(RwLock::new(tracked)),
            generation: Arc::new(AtomicU64::new(0)),
            submissions: Arc::new(Mutex::new(())),
        }
    }

    pub async fn state(&self) -> LoadState {
        self.state.read().await.state.clone()
    }

    /// Re-reads the whole list. A load that finishes after a newer one has
    /// started is dropped.
    pub async fn refresh(&self) -> LoadState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(generation, LoadState::Loading).await;

        let next = match self.store.list_users().await {
            Ok(users) => {
                debug!("Loaded {} users", users.len());
                LoadState::Loaded(users)
            }
            Err(e) => {
                warn!("Loading users failed: {}", e);
                LoadState::Failed(e.to_string())
            }
        };
        self.transition(generation, next).await;

        self.state().await
    }

    async fn transition(&self, generation: u64, state: LoadState) {
        let mut tracked = self.state.write().await;
        if generation < tracked.generation {
            debug!(
                "Dropping {} result of load {} superseded by {}",
                state.name(),
                generation,
                tracked.generation
            );
            return;
        }
        tracked.generation = generation;
        tracked.state = state;
    }

    /// Validates the form, writes a new record numbered after the current
    /// maximum and reloads the list. Submissions are handled one at a time.
    pub async fn create(&self, form: &UserForm) -> Result<Registration, CreateError> {
        form.validate().map_err(CreateError::Validation)?;

        let registration = {
            let _submission = self.submissions.lock().await;
            let mut created = store::create_user(&*self.store, &form.name, &form.email).await?;

            // the write already happened, so a failed check is only logged
            let renumbered = match reconcile(&*self.store, &mut created).await {
                Ok(renumbered) => renumbered,
                Err(e) => {
                    warn!("Could not verify user id {}: {}", created.user_id, e);
                    0
                }
            };
            Registration {
                created,
                renumbered,
            }
        };
        info!(
            "Created user {} as page {}",
            registration.created.user_id, registration.created.id
        );

        self.refresh().await;
        Ok(registration)
    }
}
