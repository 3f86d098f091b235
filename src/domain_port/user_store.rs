use crate::application_port::SessionError;
use crate::domain_model::{UserId, UserRecord};

/// Durable account records. Every mutation is a single atomic unit scoped
/// to one user's row.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, SessionError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, SessionError>;

    /// Lookup by the current refresh-token value. A rotated or cleared
    /// token matches nothing, which is what makes replay detectable.
    async fn find_by_refresh_token(&self, token: &str)
    -> Result<Option<UserRecord>, SessionError>;

    /// Insert a new account. `UsernameTaken` if the username exists.
    async fn create(&self, username: &str, password_hash: &str)
    -> Result<UserRecord, SessionError>;

    /// Persist username/password/refresh-token changes and bump
    /// `updated_at`. `UsernameTaken` on a duplicate rename.
    async fn save(&self, user: &UserRecord) -> Result<UserRecord, SessionError>;

    /// Unconditional overwrite; the previous session's refresh token dies
    /// here.
    async fn set_refresh_token(&self, user_id: UserId, token: &str) -> Result<(), SessionError>;

    /// Compare-and-swap: succeeds only while the stored token still equals
    /// `expected`. The loser of a concurrent rotation gets `RotationRace`.
    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        next: &str,
    ) -> Result<(), SessionError>;

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), SessionError>;
}
