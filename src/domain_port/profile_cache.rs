use crate::domain_model::UserRecord;

/// Read-through profile cache keyed by username. Eventually consistent
/// with the user store; every write path must `set` or `invalidate`
/// before returning.
pub trait ProfileCache: Send + Sync {
    fn set(&self, username: &str, user: UserRecord);
    fn get(&self, username: &str) -> Option<UserRecord>;
    fn invalidate(&self, username: &str);
}
