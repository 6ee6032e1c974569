use std::fmt;

use thiserror::Error;

use super::{password::PasswordError, validate::ValidationError};

/// Field named by a violated unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} is already taken")]
    Duplicate(UniqueField),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("password has not been saved yet")]
    PasswordNotPersisted,

    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}
