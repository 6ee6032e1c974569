use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username is required")]
    UsernameRequired,
    #[error("Username must be at least 3 characters long")]
    UsernameTooShort,
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email")]
    EmailInvalid,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_string()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trimmed name, or `None` when nothing is left.
pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Length in UTF-16 code units, the unit stored-document length limits use.
fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Expects an already normalised username.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    if utf16_len(username) < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    Ok(())
}

/// Expects an already normalised email.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

/// Plaintext only; passwords are not trimmed.
pub fn validate_password(plain: &str) -> Result<(), ValidationError> {
    if plain.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if utf16_len(plain) < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
