use chrono::{DateTime, Utc};

/// Process-wide revocation registry. A listed token must be rejected no
/// matter how valid its signature and claims still are. Entries become
/// dead weight once the token's own `exp` passes (decode rejects it
/// anyway), so lookups evict lazily and the composition root sweeps
/// periodically.
pub trait TokenBlacklist: Send + Sync {
    fn add(&self, token: &str, expires_at: DateTime<Utc>);
    fn is_blacklisted(&self, token: &str) -> bool;
    /// Drop entries whose expiry has passed. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}
