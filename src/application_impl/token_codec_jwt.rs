use crate::application_port::{
    AccessToken, RefreshToken, SessionError, TokenClaims, TokenCodec,
};
use crate::domain_model::UserId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Access and refresh tokens are signed with distinct secrets so that
/// compromising one kind does not compromise the other.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    username: String,
    exp: i64,
    iat: i64,
    jti: String, // uniqueness: same user + same second must still differ
}

fn encode_signed(
    user_id: UserId,
    username: &str,
    ttl: Duration,
    secret: &[u8],
) -> Result<(String, DateTime<Utc>), SessionError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + ttl;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| SessionError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_signed(token: &str, secret: &[u8]) -> Result<TokenClaims, SessionError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &v).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::TokenExpired,
            _ => SessionError::TokenInvalid,
        }
    })?;
    let user_id = data
        .claims
        .sub
        .parse::<UserId>()
        .map_err(|_| SessionError::TokenInvalid)?;
    Ok(TokenClaims {
        user_id,
        username: data.claims.username,
        expires_at: DateTime::from_timestamp(data.claims.exp, 0)
            .ok_or(SessionError::TokenInvalid)?,
    })
}

pub struct JwtTokenCodec {
    cfg: JwtConfig,
}

impl JwtTokenCodec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtTokenCodec { cfg }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtTokenCodec {
    async fn issue_access(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<(AccessToken, DateTime<Utc>), SessionError> {
        let (token, exp_dt) =
            encode_signed(user_id, username, self.cfg.access_ttl, &self.cfg.access_secret)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), SessionError> {
        let (token, exp_dt) = encode_signed(
            user_id,
            username,
            self.cfg.refresh_ttl,
            &self.cfg.refresh_secret,
        )?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn decode_access(&self, token: &str) -> Result<TokenClaims, SessionError> {
        decode_signed(token, &self.cfg.access_secret)
    }

    async fn decode_refresh(&self, token: &str) -> Result<TokenClaims, SessionError> {
        decode_signed(token, &self.cfg.refresh_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtTokenCodec {
        JwtTokenCodec::new(JwtConfig {
            access_secret: b"access-test-secret".to_vec(),
            refresh_secret: b"refresh-test-secret".to_vec(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        })
    }

    #[tokio::test]
    async fn roundtrips_claims() {
        let codec = codec();
        let (token, exp) = codec.issue_access(UserId(42), "alice").await.unwrap();
        let claims = codec.decode_access(&token.0).await.unwrap();
        assert_eq!(claims.user_id, UserId(42));
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.expires_at.timestamp(), exp.timestamp());
    }

    #[tokio::test]
    async fn secrets_are_independent() {
        let codec = codec();
        let (access, _) = codec.issue_access(UserId(1), "alice").await.unwrap();
        let (refresh, _) = codec.issue_refresh(UserId(1), "alice").await.unwrap();
        assert!(matches!(
            codec.decode_refresh(&access.0).await,
            Err(SessionError::TokenInvalid)
        ));
        assert!(matches!(
            codec.decode_access(&refresh.0).await,
            Err(SessionError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn same_second_tokens_differ() {
        let codec = codec();
        let (a, _) = codec.issue_refresh(UserId(1), "alice").await.unwrap();
        let (b, _) = codec.issue_refresh(UserId(1), "alice").await.unwrap();
        assert_ne!(a.0, b.0);
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let codec = codec();
        let (token, _) = codec.issue_access(UserId(1), "alice").await.unwrap();
        let mut tampered = token.0;
        tampered.pop();
        tampered.push('x');
        assert!(matches!(
            codec.decode_access(&tampered).await,
            Err(SessionError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let codec = codec();
        // Encode directly with an exp far enough in the past to clear the
        // default decode leeway.
        let iat = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: "1".to_string(),
            username: "alice".to_string(),
            exp: (iat + Duration::minutes(15)).timestamp(),
            iat: iat.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-test-secret"),
        )
        .unwrap();
        assert!(matches!(
            codec.decode_access(&token).await,
            Err(SessionError::TokenExpired)
        ));
    }
}
