use bson::{oid::ObjectId, DateTime};
use time::OffsetDateTime;

use super::{
    password::HashedPassword,
    repo_types::UserDocument,
    validate::{
        normalize_email, normalize_name, normalize_username, validate_email, validate_password,
        validate_username, ValidationError,
    },
};

/// Password as held in memory. `Plaintext` means "changed since last save".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Plaintext(String),
    Hashed(HashedPassword),
}

impl Credential {
    pub fn is_hashed(&self) -> bool {
        matches!(self, Credential::Hashed(_))
    }
}

/// Input for a user that has never been stored.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub(crate) id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub(crate) password: Credential,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub(crate) created_at: Option<OffsetDateTime>,
    pub(crate) updated_at: Option<OffsetDateTime>,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        Self {
            id: None,
            username: input.username,
            email: input.email,
            password: Credential::Plaintext(input.password),
            first_name: input.first_name,
            last_name: input.last_name,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn credential(&self) -> &Credential {
        &self.password
    }

    pub fn created_at(&self) -> Option<OffsetDateTime> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<OffsetDateTime> {
        self.updated_at
    }

    /// Replaces the password; it is hashed on the next save.
    pub fn set_password(&mut self, plain: impl Into<String>) {
        self.password = Credential::Plaintext(plain.into());
    }

    /// Applies trimming/lowercasing and checks every field constraint.
    pub(crate) fn normalize_and_validate(&mut self) -> Result<(), ValidationError> {
        self.username = normalize_username(&self.username);
        self.email = normalize_email(&self.email);
        self.first_name = normalize_name(self.first_name.as_deref());
        self.last_name = normalize_name(self.last_name.as_deref());

        validate_username(&self.username)?;
        validate_email(&self.email)?;
        if let Credential::Plaintext(plain) = &self.password {
            validate_password(plain)?;
        }
        Ok(())
    }

    /// Persisted form. `None` while the password is still plaintext or the
    /// record has no identity or timestamps yet.
    pub(crate) fn to_document(&self) -> Option<UserDocument> {
        self.document_at(self.id?, self.created_at?, self.updated_at?)
    }

    /// Persisted form with the given identity and timestamps; `None` while
    /// the password is still plaintext.
    pub(crate) fn document_at(
        &self,
        id: ObjectId,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Option<UserDocument> {
        let Credential::Hashed(hash) = &self.password else {
            return None;
        };
        Some(UserDocument {
            id,
            username: self.username.clone(),
            email: self.email.clone(),
            password: hash.as_str().to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            created_at: to_bson_datetime(created_at),
            updated_at: to_bson_datetime(updated_at),
        })
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: Some(doc.id),
            username: doc.username,
            email: doc.email,
            password: Credential::Hashed(HashedPassword::from_stored(doc.password)),
            first_name: doc.first_name,
            last_name: doc.last_name,
            created_at: Some(from_bson_datetime(doc.created_at)),
            updated_at: Some(from_bson_datetime(doc.updated_at)),
        }
    }
}

/// Current time at the millisecond precision the store keeps.
pub(crate) fn now_millis() -> OffsetDateTime {
    from_bson_datetime(to_bson_datetime(OffsetDateTime::now_utc()))
}

fn to_bson_datetime(t: OffsetDateTime) -> DateTime {
    DateTime::from_millis((t.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn from_bson_datetime(t: DateTime) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(t.timestamp_millis() as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
