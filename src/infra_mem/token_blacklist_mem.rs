use crate::domain_port::TokenBlacklist;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Revocation registry: token string -> the token's own expiry. Starts
/// empty on boot and is never persisted. An entry past its expiry is
/// useless (decode already rejects the token), so lookups evict lazily
/// and `purge_expired` sweeps the rest.
pub struct InMemoryTokenBlacklist {
    entries: DashMap<String, DateTime<Utc>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        InMemoryTokenBlacklist {
            entries: DashMap::new(),
        }
    }
}

impl Default for InMemoryTokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBlacklist for InMemoryTokenBlacklist {
    fn add(&self, token: &str, expires_at: DateTime<Utc>) {
        self.entries.insert(token.to_string(), expires_at);
    }

    fn is_blacklisted(&self, token: &str) -> bool {
        {
            let Some(entry) = self.entries.get(token) else {
                return false;
            };
            if *entry > Utc::now() {
                return true;
            }
        }
        // The token's own exp has passed; decode rejects it anyway.
        self.entries.remove(token);
        false
    }

    fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn listed_tokens_are_rejected_until_their_expiry() {
        let blacklist = InMemoryTokenBlacklist::new();
        assert!(!blacklist.is_blacklisted("t1"));

        blacklist.add("t1", Utc::now() + Duration::minutes(15));
        assert!(blacklist.is_blacklisted("t1"));
    }

    #[test]
    fn lookups_evict_entries_whose_token_already_expired() {
        let blacklist = InMemoryTokenBlacklist::new();
        blacklist.add("stale", Utc::now() - Duration::seconds(1));
        assert!(!blacklist.is_blacklisted("stale"));
        // And the entry is actually gone.
        assert_eq!(blacklist.purge_expired(), 0);
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let blacklist = InMemoryTokenBlacklist::new();
        blacklist.add("dead-1", Utc::now() - Duration::minutes(1));
        blacklist.add("dead-2", Utc::now() - Duration::hours(1));
        blacklist.add("live", Utc::now() + Duration::minutes(15));

        assert_eq!(blacklist.purge_expired(), 2);
        assert!(blacklist.is_blacklisted("live"));
    }
}
