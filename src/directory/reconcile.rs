use log::{info, warn};

use crate::model::{next_user_id, CreatedUser};
use crate::store::{StoreError, UserStore};

const MAX_ROUNDS: usize = 3;

/// Resolves duplicate `user_id` claims left by concurrent writers.
///
/// Of all records holding the same `user_id`, the one with the earliest
/// `(created_time, id)` keeps it. If that is not `created`, it is moved to
/// one past the current maximum and checked again. Every client applies the
/// same ordering, so racing writers converge on distinct ids.
///
/// Returns the number of times the record was renumbered.
pub async fn reconcile<S: UserStore + ?Sized>(
    store: &S,
    created: &mut CreatedUser,
) -> Result<usize, StoreError> {
    let mut renumbered = 0;

    for _ in 0..MAX_ROUNDS {
        let users = store.list_users().await?;
        let owner = users
            .iter()
            .filter(|u| u.user_id == created.user_id)
            .min_by(|a, b| a.claim_order().cmp(&b.claim_order()));

        match owner {
            Some(owner) if owner.id != created.id => {
                let next = next_user_id(&users).map_err(|e| StoreError::Write(e.to_string()))?;
                info!(
                    "User id {} already held by {}, moving {} to {}",
                    created.user_id, owner.id, created.id, next
                );
                store.renumber_user(&created.id, next).await?;
                created.user_id = next;
                renumbered += 1;
            }
            _ => return Ok(renumbered),
        }
    }

    warn!(
        "User id of {} still contended after {} rounds",
        created.id, MAX_ROUNDS
    );
    Ok(renumbered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewUser;
    use crate::store::{create_user, MemoryStore};

    fn new_user(user_id: u64, name: &str) -> NewUser {
        NewUser {
            user_id,
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn should_keep_uncontended_id() {
        let store = MemoryStore::with_ids(&[1, 2]);
        let mut created = create_user(&store, "Carol", "c@example.com").await.unwrap();

        let renumbered = reconcile(&store, &mut created).await.unwrap();
        assert_eq!(renumbered, 0);
        assert_eq!(created.user_id, 3);
    }

    #[tokio::test]
    async fn should_move_later_claim_past_max() {
        let store = MemoryStore::with_ids(&[1, 3, 5]);
        store.race_next_insert(new_user(6, "Eve"));

        let mut created = create_user(&store, "Dave", "d@example.com").await.unwrap();
        assert_eq!(created.user_id, 6);

        let renumbered = reconcile(&store, &mut created).await.unwrap();
        assert_eq!(renumbered, 1);
        assert_eq!(created.user_id, 7);

        let mut ids = store
            .snapshot()
            .iter()
            .map(|u| u.user_id)
            .collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec![1, 3, 5, 6, 7]);
    }

    #[tokio::test]
    async fn should_leave_earlier_claim_alone() {
        let store = MemoryStore::new();
        let mut first = create_user(&store, "Alice", "a@example.com").await.unwrap();

        // a later record with the same id belongs to someone else
        store.insert_user(&new_user(1, "Mallory")).await.unwrap();

        assert_eq!(reconcile(&store, &mut first).await.unwrap(), 0);
        assert_eq!(first.user_id, 1);
    }

    #[tokio::test]
    async fn should_surface_query_failure() {
        let store = MemoryStore::new();
        let mut created = create_user(&store, "Alice", "a@example.com").await.unwrap();
        store.fail_queries("timeout");

        let err = reconcile(&store, &mut created).await.unwrap_err();
        assert_eq!(err, StoreError::Query("timeout".into()));
    }
}
