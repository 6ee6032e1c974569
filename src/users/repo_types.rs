use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

/// User document as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub password: String, // argon2 PHC string, never plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
