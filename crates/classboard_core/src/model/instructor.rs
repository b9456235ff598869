//! Instructor entity.
//!
//! # Invariants
//! - `password` always holds a credential hash, never plaintext.
//! - `email` is unique across instructors (checked before writes, not atomic).

use crate::model::clock::now_timestamp;
use crate::model::credential::{hash_password, PASSWORD_FIELD};
use crate::model::validation::{require_email, require_text, ValidationError};
use crate::model::{default_active, new_entity_id, Entity, EntityKind, IndexSpec};
use serde::{Deserialize, Serialize};

pub const EMAIL_INDEX: IndexSpec = IndexSpec::unique("EmailIndex", "email");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Instructor {
    /// Registers a new instructor, hashing the plaintext password.
    ///
    /// # Errors
    /// - `PasswordTooShort` when the plaintext is shorter than 6 characters.
    pub fn register(
        name: impl Into<String>,
        email: impl Into<String>,
        plaintext_password: &str,
    ) -> Result<Self, ValidationError> {
        let password = hash_password(plaintext_password)?;
        let stamp = now_timestamp();
        Ok(Self {
            id: new_entity_id(),
            name: name.into(),
            email: email.into(),
            password,
            active: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        })
    }
}

impl Entity for Instructor {
    const KIND: EntityKind = EntityKind::Instructor;
    const INDEXES: &'static [IndexSpec] = &[EMAIL_INDEX];
    const SENSITIVE_FIELDS: &'static [&'static str] = &[PASSWORD_FIELD];

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", "Name", &self.name)?;
        require_email(&self.email)?;
        require_text(PASSWORD_FIELD, "Password", &self.password)
    }
}
