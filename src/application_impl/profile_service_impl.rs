use crate::application_impl::validation::{validate_password, validate_username};
use crate::application_port::{
    CredentialHasher, ProfileOutput, ProfileService, SessionError, UpdateMeInput, UpdateMeOutput,
};
use crate::domain_model::UserId;
use crate::domain_port::{ProfileCache, UserStore};
use std::sync::Arc;
use tracing::debug;

pub struct RealProfileService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    cache: Arc<dyn ProfileCache>,
}

impl RealProfileService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        cache: Arc<dyn ProfileCache>,
    ) -> Self {
        Self {
            store,
            hasher,
            cache,
        }
    }
}

#[async_trait::async_trait]
impl ProfileService for RealProfileService {
    async fn get_me(&self, user_id: UserId) -> Result<ProfileOutput, SessionError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;
        Ok(ProfileOutput {
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    async fn update_me(
        &self,
        user_id: UserId,
        request: UpdateMeInput,
    ) -> Result<UpdateMeOutput, SessionError> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;
        let old_username = user.username.clone();

        if let Some(new_username) = request.new_username {
            validate_username(&new_username)?;
            if let Some(holder) = self.store.find_by_username(&new_username).await? {
                if holder.id != user_id {
                    return Err(SessionError::UsernameTaken);
                }
            }
            user.username = new_username;
        }

        if let (Some(old_password), Some(new_password)) =
            (request.old_password, request.new_password)
        {
            validate_password(&new_password)?;
            let ok = self
                .hasher
                .verify_password(&old_password, &user.password_hash)
                .await?;
            if !ok {
                return Err(SessionError::OldPasswordIncorrect);
            }
            user.password_hash = self.hasher.hash_password(&new_password).await?;
        }

        let updated = self.store.save(&user).await?;

        // Drop the old key before publishing the fresh snapshot; a rename
        // must not leave the old username serving stale reads.
        self.cache.invalidate(&old_username);
        self.cache.set(&updated.username, updated.clone());

        debug!(%user_id, "profile updated");
        Ok(UpdateMeOutput {
            username: updated.username,
            updated_at: updated.updated_at,
        })
    }
}
