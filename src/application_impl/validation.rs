use crate::application_port::SessionError;

/// Request-shape validation, run by the boundary layer before any service
/// is reached. Kept as plain functions with a typed result so the
/// transport can map failures straight to 400.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl From<ValidationError> for SessionError {
    fn from(e: ValidationError) -> Self {
        SessionError::Validation(e.0)
    }
}

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 128;

pub fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_password(password)?;
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(ValidationError(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError(
            "username must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN || len > PASSWORD_MAX {
        return Err(ValidationError(format!(
            "password must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

pub fn validate_refresh_request(refresh_token: &str) -> Result<(), ValidationError> {
    if refresh_token.is_empty() {
        return Err(ValidationError("refreshToken must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_credentials() {
        assert!(validate_credentials("alice", "secret1").is_ok());
    }

    #[test]
    fn rejects_short_username_and_password() {
        assert!(validate_credentials("al", "secret1").is_err());
        assert!(validate_credentials("alice", "pw").is_err());
    }

    #[test]
    fn rejects_whitespace_in_username() {
        assert!(validate_username("al ice").is_err());
    }

    #[test]
    fn rejects_oversized_input() {
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn refresh_request_needs_a_token() {
        assert!(validate_refresh_request("").is_err());
        assert!(validate_refresh_request("some-token").is_ok());
    }
}
