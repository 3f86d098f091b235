use crate::application_impl::validation::validate_credentials;
use crate::application_port::{
    LoginInput, LoginOutput, RegisterInput, RegisterOutput, SessionError, SessionService,
    TokenPair,
};
use crate::application_port::{CredentialHasher, TokenCodec};
use crate::domain_model::UserId;
use crate::domain_port::{ProfileCache, TokenBlacklist, UserStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Orchestrates store, hasher, codec, cache and blacklist into the
/// register/login/logout/refresh lifecycle. All collaborators are injected
/// by the composition root; this type holds no state of its own.
pub struct RealSessionService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    codec: Arc<dyn TokenCodec>,
    cache: Arc<dyn ProfileCache>,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl RealSessionService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        codec: Arc<dyn TokenCodec>,
        cache: Arc<dyn ProfileCache>,
        blacklist: Arc<dyn TokenBlacklist>,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            cache,
            blacklist,
        }
    }

    /// Best effort expiry for a token being revoked: if it no longer
    /// decodes (already expired or mangled) there is nothing left to
    /// protect, so the entry may die immediately.
    async fn revoke_until_expiry(&self, token: &str, expires_at: Option<DateTime<Utc>>) {
        let exp = expires_at.unwrap_or_else(Utc::now);
        self.blacklist.add(token, exp);
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn register(&self, request: RegisterInput) -> Result<RegisterOutput, SessionError> {
        let RegisterInput { username, password } = request;
        validate_credentials(&username, &password)?;

        if self.store.find_by_username(&username).await?.is_some() {
            warn!(%username, "registration rejected: username already exists");
            return Err(SessionError::UsernameTaken);
        }

        let password_hash = self.hasher.hash_password(&password).await?;
        let user = self.store.create(&username, &password_hash).await?;

        self.cache.set(&user.username, user.clone());
        debug!(user_id = %user.id, "registered new user");

        Ok(RegisterOutput {
            username: user.username,
            created_at: user.created_at,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<LoginOutput, SessionError> {
        let LoginInput { username, password } = request;

        // Read-through: cache first, store on miss.
        let user = match self.cache.get(&username) {
            Some(user) => user,
            None => self
                .store
                .find_by_username(&username)
                .await?
                .ok_or(SessionError::InvalidCredentials)?,
        };

        let ok = self
            .hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            warn!(%username, "login rejected: password mismatch");
            return Err(SessionError::InvalidCredentials);
        }

        let (access_token, _) = self.codec.issue_access(user.id, &user.username).await?;
        let (refresh_token, _) = self.codec.issue_refresh(user.id, &user.username).await?;

        // Overwrite: whatever refresh token was on file becomes unusable now.
        self.store
            .set_refresh_token(user.id, &refresh_token.0)
            .await?;

        let mut snapshot = user.clone();
        snapshot.refresh_token = Some(refresh_token.0.clone());
        snapshot.updated_at = Utc::now();
        self.cache.set(&user.username, snapshot);

        debug!(user_id = %user.id, "login succeeded");
        Ok(LoginOutput {
            username: user.username,
            access_token,
            refresh_token,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), SessionError> {
        let Some(user) = self.store.find_by_id(user_id).await? else {
            debug!(%user_id, "logout for unknown user id, nothing to do");
            return Ok(());
        };

        self.store.clear_refresh_token(user_id).await?;
        self.cache.invalidate(&user.username);

        // Revoke the exact bearer token the caller presented, plus the
        // refresh token that was on file, each until its natural expiry.
        let access_exp = self
            .codec
            .decode_access(access_token)
            .await
            .ok()
            .map(|c| c.expires_at);
        self.revoke_until_expiry(access_token, access_exp).await;

        if let Some(refresh_token) = user.refresh_token.as_deref() {
            let refresh_exp = self
                .codec
                .decode_refresh(refresh_token)
                .await
                .ok()
                .map(|c| c.expires_at);
            self.revoke_until_expiry(refresh_token, refresh_exp).await;
        }

        debug!(%user_id, "logged out");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        if self.blacklist.is_blacklisted(refresh_token) {
            warn!("refresh rejected: token is blacklisted");
            return Err(SessionError::TokenInvalid);
        }

        self.codec.decode_refresh(refresh_token).await?;

        // Resolve the owner by the token value itself, not the username
        // claim: a rotated or cleared token verifies fine cryptographically
        // but matches no row, which is exactly the replay we must refuse.
        let user = self
            .store
            .find_by_refresh_token(refresh_token)
            .await?
            .ok_or(SessionError::TokenInvalid)?;

        let (access_token, _) = self.codec.issue_access(user.id, &user.username).await?;
        let (next_refresh, _) = self.codec.issue_refresh(user.id, &user.username).await?;

        // Rotation. The compare-and-swap makes concurrent refreshes of the
        // same token pick exactly one winner.
        self.store
            .rotate_refresh_token(user.id, refresh_token, &next_refresh.0)
            .await?;

        let mut snapshot = user.clone();
        snapshot.refresh_token = Some(next_refresh.0.clone());
        snapshot.updated_at = Utc::now();
        self.cache.set(&user.username, snapshot);

        debug!(user_id = %user.id, "refresh token rotated");
        Ok(TokenPair {
            access_token,
            refresh_token: next_refresh,
        })
    }

    async fn authenticate(&self, access_token: &str) -> Result<UserId, SessionError> {
        if self.blacklist.is_blacklisted(access_token) {
            return Err(SessionError::TokenInvalid);
        }

        let claims = self.codec.decode_access(access_token).await?;

        if self.store.find_by_id(claims.user_id).await?.is_none() {
            return Err(SessionError::UserNotFound);
        }

        Ok(claims.user_id)
    }
}
