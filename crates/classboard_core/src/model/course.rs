//! Course entity, taught by one instructor.

use crate::model::clock::now_timestamp;
use crate::model::validation::{require_text, ValidationError};
use crate::model::{default_active, new_entity_id, Entity, EntityKind, IndexSpec};
use serde::{Deserialize, Serialize};

pub const INSTRUCTOR_INDEX: IndexSpec = IndexSpec::new("InstructorIndex", "instructor_id");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// Soft reference; existence of the instructor is not checked.
    pub instructor_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Course {
    pub fn new(name: impl Into<String>, instructor_id: impl Into<String>) -> Self {
        let stamp = now_timestamp();
        Self {
            id: new_entity_id(),
            name: name.into(),
            instructor_id: instructor_id.into(),
            active: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;
    const INDEXES: &'static [IndexSpec] = &[INSTRUCTOR_INDEX];

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
        require_text("instructor_id", "Instructor ID", &self.instructor_id)
    }
}
