use super::SessionError;
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutput {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMeInput {
    pub new_username: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMeOutput {
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    async fn get_me(&self, user_id: UserId) -> Result<ProfileOutput, SessionError>;
    async fn update_me(
        &self,
        user_id: UserId,
        request: UpdateMeInput,
    ) -> Result<UpdateMeOutput, SessionError>;
}
