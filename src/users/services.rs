use bson::oid::ObjectId;
use tracing::{debug, info, instrument, warn};

use super::{
    error::UserError,
    model::{now_millis, Credential, User},
    password::{compare_credential, hash_credential},
    repo::UserStore,
    validate::{normalize_email, normalize_username},
};

impl User {
    /// Validates, hashes the password if it changed, then inserts or
    /// replaces the record.
    #[instrument(skip(self, store), fields(username = %self.username))]
    pub async fn save(&mut self, store: &dyn UserStore) -> Result<(), UserError> {
        if let Err(e) = self.normalize_and_validate() {
            warn!(error = %e, "user validation failed");
            return Err(e.into());
        }

        if let Credential::Plaintext(plain) = &self.password {
            let hashed = hash_credential(plain.clone()).await?;
            self.password = Credential::Hashed(hashed);
            debug!("password hashed");
        }

        // Identity and timestamps are staged; `self` only sees them once stored.
        let now = now_millis();
        let (id, created_at) = match (self.id, self.created_at) {
            (Some(id), Some(created_at)) => (id, created_at),
            (Some(id), None) => (id, now),
            (None, _) => (ObjectId::new(), now),
        };
        let doc = self
            .document_at(id, created_at, now)
            .ok_or(UserError::NotFound)?;

        if self.id.is_some() {
            store.replace(&doc).await?;
            info!(user_id = %id, "user updated");
        } else {
            store.insert(&doc).await?;
            info!(user_id = %id, "user created");
        }

        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(now);
        Ok(())
    }

    /// Checks `candidate` against the stored hash.
    pub async fn compare_password(&self, candidate: &str) -> Result<bool, UserError> {
        match &self.password {
            Credential::Hashed(hash) => {
                Ok(compare_credential(candidate.to_string(), hash.clone()).await?)
            }
            Credential::Plaintext(_) => Err(UserError::PasswordNotPersisted),
        }
    }

    pub async fn find_by_id(store: &dyn UserStore, id: ObjectId) -> Result<Option<User>, UserError> {
        Ok(store.find_by_id(id).await?.map(User::from))
    }

    pub async fn find_by_username(
        store: &dyn UserStore,
        username: &str,
    ) -> Result<Option<User>, UserError> {
        let username = normalize_username(username);
        Ok(store.find_by_username(&username).await?.map(User::from))
    }

    pub async fn find_by_email(store: &dyn UserStore, email: &str) -> Result<Option<User>, UserError> {
        let email = normalize_email(email);
        Ok(store.find_by_email(&email).await?.map(User::from))
    }

    /// Removes the record. Deleting an unsaved user is `NotFound`.
    #[instrument(skip(self, store), fields(username = %self.username))]
    pub async fn delete(self, store: &dyn UserStore) -> Result<(), UserError> {
        let id = self.id.ok_or(UserError::NotFound)?;
        if !store.delete(id).await? {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
