mod error;
#[cfg(test)]
pub(crate) mod memory;
mod model;
pub mod password;
pub mod repo;
pub mod repo_types;
mod services;
pub mod validate;

pub use error::{UniqueField, UserError};
pub use model::{Credential, NewUser, User};
pub use password::{HashedPassword, PasswordError};
pub use repo::{MongoUserStore, UserStore};
pub use repo_types::{UserDocument, USERS_COLLECTION};
pub use validate::ValidationError;
