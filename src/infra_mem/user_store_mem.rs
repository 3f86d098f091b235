use crate::application_port::SessionError;
use crate::domain_model::{UserId, UserRecord};
use crate::domain_port::UserStore;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-process user store: the "memory" backend and the test double. Ids
/// are assigned from an atomic counter; username uniqueness is enforced
/// through a secondary index whose entry lock makes `create` atomic.
pub struct MemoryUserStore {
    users: DashMap<i64, UserRecord>,
    username_index: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        MemoryUserStore {
            users: DashMap::new(),
            username_index: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    #[cfg(test)]
    pub fn remove(&self, user_id: UserId) {
        if let Some((_, user)) = self.users.remove(&user_id.0) {
            self.username_index.remove(&user.username);
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        let Some(id) = self.username_index.get(username).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, SessionError> {
        Ok(self.users.get(&user_id.0).map(|e| e.value().clone()))
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().refresh_token.as_deref() == Some(token))
            .map(|e| e.value().clone()))
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, SessionError> {
        match self.username_index.entry(username.to_string()) {
            Entry::Occupied(_) => Err(SessionError::UsernameTaken),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let now = Utc::now();
                let user = UserRecord {
                    id: UserId(id),
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    refresh_token: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(id);
                self.users.insert(id, user.clone());
                Ok(user)
            }
        }
    }

    async fn save(&self, user: &UserRecord) -> Result<UserRecord, SessionError> {
        let current = self
            .users
            .get(&user.id.0)
            .map(|e| e.value().clone())
            .ok_or(SessionError::UserNotFound)?;

        if current.username != user.username {
            match self.username_index.entry(user.username.clone()) {
                Entry::Occupied(_) => return Err(SessionError::UsernameTaken),
                Entry::Vacant(slot) => {
                    slot.insert(user.id.0);
                }
            }
            self.username_index.remove(&current.username);
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        self.users.insert(user.id.0, updated.clone());
        Ok(updated)
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<(), SessionError> {
        let mut entry = self
            .users
            .get_mut(&user_id.0)
            .ok_or(SessionError::UserNotFound)?;
        entry.refresh_token = Some(token.to_string());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        next: &str,
    ) -> Result<(), SessionError> {
        // Compare-and-swap under the row's entry lock.
        let mut entry = self
            .users
            .get_mut(&user_id.0)
            .ok_or(SessionError::UserNotFound)?;
        if entry.refresh_token.as_deref() != Some(expected) {
            return Err(SessionError::RotationRace);
        }
        entry.refresh_token = Some(next.to_string());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), SessionError> {
        let mut entry = self
            .users
            .get_mut(&user_id.0)
            .ok_or(SessionError::UserNotFound)?;
        entry.refresh_token = None;
        entry.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_rejects_duplicates() {
        let store = MemoryUserStore::new();
        let a = store.create("alice", "hash-a").await.unwrap();
        let b = store.create("bob", "hash-b").await.unwrap();
        assert!(b.id.0 > a.id.0);

        let err = store.create("alice", "hash-c").await.unwrap_err();
        assert!(matches!(err, SessionError::UsernameTaken));
    }

    #[tokio::test]
    async fn rotate_is_a_compare_and_swap() {
        let store = MemoryUserStore::new();
        let user = store.create("alice", "hash").await.unwrap();
        store.set_refresh_token(user.id, "r1").await.unwrap();

        store.rotate_refresh_token(user.id, "r1", "r2").await.unwrap();
        let err = store
            .rotate_refresh_token(user.id, "r1", "r3")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::RotationRace));

        let on_file = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(on_file.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn refresh_token_lookup_misses_after_clear() {
        let store = MemoryUserStore::new();
        let user = store.create("alice", "hash").await.unwrap();
        store.set_refresh_token(user.id, "r1").await.unwrap();
        assert!(store.find_by_refresh_token("r1").await.unwrap().is_some());

        store.clear_refresh_token(user.id).await.unwrap();
        assert!(store.find_by_refresh_token("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_moves_the_username_index() {
        let store = MemoryUserStore::new();
        let mut user = store.create("alice", "hash").await.unwrap();
        user.username = "alicia".to_string();
        store.save(&user).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_none());
        assert_eq!(
            store.find_by_username("alicia").await.unwrap().unwrap().id,
            user.id
        );
    }

    #[tokio::test]
    async fn save_rejects_renaming_onto_another_user() {
        let store = MemoryUserStore::new();
        let mut alice = store.create("alice", "hash").await.unwrap();
        store.create("bob", "hash").await.unwrap();

        alice.username = "bob".to_string();
        let err = store.save(&alice).await.unwrap_err();
        assert!(matches!(err, SessionError::UsernameTaken));
    }
}
