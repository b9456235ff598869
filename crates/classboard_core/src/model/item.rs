//! Item entity: a positioned document pinned to a board.
//!
//! # Invariants
//! - `document` is the public retrieval URL of the attached blob.
//! - `document_key`, when present, is the blob key issued with the upload
//!   grant and takes precedence over parsing `document` at delete time.
//! - Changing `document` without a matching `document_key` clears the key.

use crate::blob::UploadGrant;
use crate::model::clock::now_timestamp;
use crate::model::validation::{require_finite, require_text, ValidationError};
use crate::model::{new_entity_id, AttributeMap, Entity, EntityKind, IndexSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DOCUMENT_FIELD: &str = "document";
pub const DOCUMENT_KEY_FIELD: &str = "document_key";

pub const BOARD_INDEX: IndexSpec = IndexSpec::new("BoardIndex", "board_id");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub board_id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    /// Creates an item referencing a document by URL only.
    pub fn new(board_id: impl Into<String>, x: f64, y: f64, document: impl Into<String>) -> Self {
        let stamp = now_timestamp();
        Self {
            id: new_entity_id(),
            board_id: board_id.into(),
            x,
            y,
            document: document.into(),
            document_key: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }

    /// Creates an item for a freshly issued upload, keeping the blob key.
    pub fn from_upload(board_id: impl Into<String>, x: f64, y: f64, grant: &UploadGrant) -> Self {
        let mut item = Self::new(board_id, x, y, grant.public_url.clone());
        item.document_key = Some(grant.key.clone());
        item
    }
}

impl Entity for Item {
    const KIND: EntityKind = EntityKind::Item;
    const INDEXES: &'static [IndexSpec] = &[BOARD_INDEX];

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn prepare_changes(changes: &mut AttributeMap) {
        if changes.contains_key(DOCUMENT_FIELD) && !changes.contains_key(DOCUMENT_KEY_FIELD) {
            changes.insert(DOCUMENT_KEY_FIELD.to_string(), Value::Null);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("board_id", "Board ID", &self.board_id)?;
        require_finite("x", self.x)?;
        require_finite("y", self.y)?;
        require_text("document", "Document URL", &self.document)
    }
}
