use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, IndexModel,
};
use tracing::{debug, instrument};

use super::{
    error::{UniqueField, UserError},
    repo_types::UserDocument,
};

const DUPLICATE_KEY: i32 = 11000;

/// Storage seam for user documents. Uniqueness of `username` and `email`
/// is the store's job.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, doc: &UserDocument) -> Result<(), UserError>;
    /// Replaces the stored document with the same `_id`.
    async fn replace(&self, doc: &UserDocument) -> Result<(), UserError>;
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserDocument>, UserError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDocument>, UserError>;
    /// Returns whether a document was removed.
    async fn delete(&self, id: ObjectId) -> Result<bool, UserError>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(users: Collection<UserDocument>) -> Self {
        Self { users }
    }

    /// Creates the unique indexes `username_1` and `email_1`.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        let unique = || IndexOptions::builder().unique(true).build();
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(unique())
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique())
                .build(),
        ];
        self.users.create_indexes(indexes).await?;
        debug!(collection = %self.users.name(), "user indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[instrument(skip(self, doc), fields(user_id = %doc.id))]
    async fn insert(&self, doc: &UserDocument) -> Result<(), UserError> {
        self.users.insert_one(doc).await.map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self, doc), fields(user_id = %doc.id))]
    async fn replace(&self, doc: &UserDocument) -> Result<(), UserError> {
        let result = self
            .users
            .replace_one(doc! { "_id": doc.id }, doc)
            .await
            .map_err(map_write_error)?;
        if result.matched_count == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserDocument>, UserError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>, UserError> {
        Ok(self.users.find_one(doc! { "username": username }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDocument>, UserError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, UserError> {
        let result = self.users.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

fn map_write_error(err: mongodb::error::Error) -> UserError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write)) = *err.kind {
        if write.code == DUPLICATE_KEY {
            return match duplicate_field(&write.message) {
                Some(field) => UserError::Duplicate(field),
                None => UserError::DuplicateKey(write.message.clone()),
            };
        }
    }
    UserError::Database(err)
}

/// Reads the violated index out of an E11000 message, e.g.
/// `E11000 duplicate key error collection: calesync.users index: email_1 dup key: { ... }`.
pub(crate) fn duplicate_field(message: &str) -> Option<UniqueField> {
    let index = message
        .split("index: ")
        .nth(1)?
        .split_whitespace()
        .next()?;
    match index {
        i if i.starts_with("username") => Some(UniqueField::Username),
        i if i.starts_with("email") => Some(UniqueField::Email),
        _ => None,
    }
}
