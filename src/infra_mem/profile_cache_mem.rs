use crate::domain_model::UserRecord;
use crate::domain_port::ProfileCache;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    user: UserRecord,
    expires_at: Instant,
}

/// TTL cache keyed by username. The TTL is fixed at construction; expiry
/// is enforced lazily on `get`.
pub struct InMemoryProfileCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl InMemoryProfileCache {
    pub fn new(ttl: Duration) -> Self {
        InMemoryProfileCache {
            entries: DashMap::new(),
            ttl,
        }
    }
}

impl ProfileCache for InMemoryProfileCache {
    fn set(&self, username: &str, user: UserRecord) {
        self.entries.insert(
            username.to_string(),
            CacheEntry {
                user,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn get(&self, username: &str) -> Option<UserRecord> {
        {
            let entry = self.entries.get(username)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.user.clone());
            }
        }
        // Expired; the guard is dropped, so the entry can go.
        self.entries.remove(username);
        None
    }

    fn invalidate(&self, username: &str) {
        self.entries.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UserId;
    use chrono::Utc;

    fn user(username: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: UserId(1),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn set_get_invalidate() {
        let cache = InMemoryProfileCache::new(Duration::from_secs(60));
        assert!(cache.get("alice").is_none());

        cache.set("alice", user("alice"));
        assert_eq!(cache.get("alice").unwrap().username, "alice");

        cache.invalidate("alice");
        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let cache = InMemoryProfileCache::new(Duration::from_millis(10));
        cache.set("alice", user("alice"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn set_overwrites_the_previous_snapshot() {
        let cache = InMemoryProfileCache::new(Duration::from_secs(60));
        cache.set("alice", user("alice"));
        let mut updated = user("alice");
        updated.refresh_token = Some("r2".to_string());
        cache.set("alice", updated);
        assert_eq!(
            cache.get("alice").unwrap().refresh_token.as_deref(),
            Some("r2")
        );
    }
}
