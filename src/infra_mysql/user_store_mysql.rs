use super::util::is_dup_key;
use crate::application_port::SessionError;
use crate::domain_model::{UserId, UserRecord};
use crate::domain_port::UserStore;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// MySQL-backed user store. Schema:
///
/// ```sql
/// CREATE TABLE account (
///     id            BIGINT       NOT NULL AUTO_INCREMENT PRIMARY KEY,
///     username      VARCHAR(32)  NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     refresh_token TEXT         NULL,
///     created_at    TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP,
///     updated_at    TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP
///                                ON UPDATE CURRENT_TIMESTAMP,
///     INDEX idx_account_refresh_token (refresh_token(255))
/// );
/// ```
///
/// Every mutation is a single statement, so each is atomic on its row
/// without an explicit transaction.
pub struct MySqlUserStore {
    pool: MySqlPool,
}

impl MySqlUserStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserStore { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, SessionError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let refresh_token: Option<String> = row
            .try_get("refresh_token")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| SessionError::Store(e.to_string()))?;

        Ok(UserRecord {
            id: UserId(id),
            username,
            password_hash,
            refresh_token,
            created_at,
            updated_at,
        })
    }

    async fn fetch_one_where(
        &self,
        column: &str,
        bind: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        let sql = format!(
            "SELECT id, username, password_hash, refresh_token, created_at, updated_at \
             FROM account WHERE {column} = ?"
        );
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, SessionError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(1) FROM account WHERE id = ?"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;

        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl UserStore for MySqlUserStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        self.fetch_one_where("username", username).await
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, SessionError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, username, password_hash, refresh_token, created_at, updated_at
FROM account
WHERE id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        self.fetch_one_where("refresh_token", token).await
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, SessionError> {
        let res = sqlx::query(
            r#"
INSERT INTO account (username, password_hash)
VALUES (?, ?)
"#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                SessionError::UsernameTaken
            } else {
                SessionError::Store(e.to_string())
            }
        })?;

        let id = UserId(res.last_insert_id() as i64);
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SessionError::Store("inserted account row vanished".to_string()))
    }

    async fn save(&self, user: &UserRecord) -> Result<UserRecord, SessionError> {
        sqlx::query(
            r#"
UPDATE account
SET username = ?, password_hash = ?, refresh_token = ?, updated_at = CURRENT_TIMESTAMP
WHERE id = ?
"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.refresh_token)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                SessionError::UsernameTaken
            } else {
                SessionError::Store(e.to_string())
            }
        })?;

        self.find_by_id(user.id).await?.ok_or(SessionError::UserNotFound)
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<(), SessionError> {
        let res = sqlx::query(
            r#"
UPDATE account
SET refresh_token = ?, updated_at = CURRENT_TIMESTAMP
WHERE id = ?
"#,
        )
        .bind(token)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;

        // Tokens carry a unique jti, so zero changed rows means the row is
        // missing rather than an idempotent rewrite.
        if res.rows_affected() == 0 && !self.id_exists(user_id).await? {
            return Err(SessionError::UserNotFound);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        next: &str,
    ) -> Result<(), SessionError> {
        // Conditional update: the row-level write lock makes this the
        // compare-and-swap that serializes concurrent rotations.
        let res = sqlx::query(
            r#"
UPDATE account
SET refresh_token = ?, updated_at = CURRENT_TIMESTAMP
WHERE id = ? AND refresh_token = ?
"#,
        )
        .bind(next)
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;

        if res.rows_affected() == 0 {
            if self.id_exists(user_id).await? {
                return Err(SessionError::RotationRace);
            }
            return Err(SessionError::UserNotFound);
        }
        Ok(())
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), SessionError> {
        let res = sqlx::query(
            r#"
UPDATE account
SET refresh_token = NULL, updated_at = CURRENT_TIMESTAMP
WHERE id = ? AND refresh_token IS NOT NULL
"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;

        if res.rows_affected() == 0 && !self.id_exists(user_id).await? {
            return Err(SessionError::UserNotFound);
        }
        Ok(())
    }
}
