use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use bson::oid::ObjectId;

use super::{
    error::{UniqueField, UserError},
    repo::UserStore,
    repo_types::UserDocument,
};

/// In-process store with the same unique constraints as the collection.
#[derive(Default)]
pub struct MemoryUserStore {
    docs: Mutex<HashMap<ObjectId, UserDocument>>,
}

impl MemoryUserStore {
    pub fn get(&self, id: ObjectId) -> Option<UserDocument> {
        self.docs.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    fn check_unique(
        docs: &HashMap<ObjectId, UserDocument>,
        doc: &UserDocument,
    ) -> Result<(), UserError> {
        for other in docs.values().filter(|d| d.id != doc.id) {
            if other.username == doc.username {
                return Err(UserError::Duplicate(UniqueField::Username));
            }
            if other.email == doc.email {
                return Err(UserError::Duplicate(UniqueField::Email));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, doc: &UserDocument) -> Result<(), UserError> {
        let mut docs = self.docs.lock().unwrap();
        if docs.contains_key(&doc.id) {
            return Err(UserError::DuplicateKey(format!("_id {}", doc.id)));
        }
        Self::check_unique(&docs, doc)?;
        docs.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn replace(&self, doc: &UserDocument) -> Result<(), UserError> {
        let mut docs = self.docs.lock().unwrap();
        if !docs.contains_key(&doc.id) {
            return Err(UserError::NotFound);
        }
        Self::check_unique(&docs, doc)?;
        docs.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserDocument>, UserError> {
        Ok(self.get(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>, UserError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.values().find(|d| d.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDocument>, UserError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.values().find(|d| d.email == email).cloned())
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, UserError> {
        Ok(self.docs.lock().unwrap().remove(&id).is_some())
    }
}
