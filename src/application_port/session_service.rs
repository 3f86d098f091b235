use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Typed failure taxonomy. The boundary layer maps variants 1:1 to
/// transport status codes without looking at message text:
/// `Validation` -> 400; `UsernameTaken`, `RotationRace`,
/// `OldPasswordIncorrect` -> 409; `InvalidCredentials`, `TokenInvalid`,
/// `TokenExpired` -> 401; `UserNotFound` -> 401/404 by context.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username already exists")]
    UsernameTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("refresh token was rotated concurrently")]
    RotationRace,
    #[error("old password is incorrect")]
    OldPasswordIncorrect,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutput {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutput {
    pub username: String,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// Claims carried by both token kinds: `{userId, username, exp}` plus a
/// per-token `jti` for uniqueness.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<(AccessToken, DateTime<Utc>), SessionError>;
    async fn issue_refresh(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), SessionError>;
    /// Signature/structure/expiry check only. Blacklist and ownership are
    /// layered on top by the session service.
    async fn decode_access(&self, token: &str) -> Result<TokenClaims, SessionError>;
    async fn decode_refresh(&self, token: &str) -> Result<TokenClaims, SessionError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, SessionError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, SessionError>;
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<RegisterOutput, SessionError>;
    async fn login(&self, request: LoginInput) -> Result<LoginOutput, SessionError>;
    /// Unknown `user_id` is a silent no-op. `access_token` is the exact
    /// bearer token the caller presented; it gets blacklisted along with
    /// the stored refresh token.
    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), SessionError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;
    /// Bearer verification for the boundary layer: blacklist, signature,
    /// owner existence.
    async fn authenticate(&self, access_token: &str) -> Result<UserId, SessionError>;
}
