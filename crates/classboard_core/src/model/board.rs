//! Board entity: a shared canvas that items and sessions attach to.

use crate::model::clock::now_timestamp;
use crate::model::validation::{require_text, ValidationError};
use crate::model::{default_active, new_entity_id, Entity, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Board {
    /// Creates an active board with a generated id and matching audit stamps.
    pub fn new(title: impl Into<String>) -> Self {
        let stamp = now_timestamp();
        Self {
            id: new_entity_id(),
            title: title.into(),
            active: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl Entity for Board {
    const KIND: EntityKind = EntityKind::Board;

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
        require_text("title", "Title", &self.title)
    }
}
