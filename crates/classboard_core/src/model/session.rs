//! Session entity: one meeting of a course on a board.

use crate::model::clock::now_timestamp;
use crate::model::validation::{require_text, ValidationError};
use crate::model::{default_active, new_entity_id, Entity, EntityKind, IndexSpec};
use serde::{Deserialize, Serialize};

pub const COURSE_INDEX: IndexSpec = IndexSpec::new("CourseIndex", "course_id");
pub const BOARD_INDEX: IndexSpec = IndexSpec::new("BoardIndex", "board_id");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub course_id: String,
    pub board_id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(
        course_id: impl Into<String>,
        board_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let stamp = now_timestamp();
        Self {
            id: new_entity_id(),
            course_id: course_id.into(),
            board_id: board_id.into(),
            name: name.into(),
            active: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

impl Entity for Session {
    const KIND: EntityKind = EntityKind::Session;
    const INDEXES: &'static [IndexSpec] = &[COURSE_INDEX, BOARD_INDEX];

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
        require_text("course_id", "Course ID", &self.course_id)?;
        require_text("board_id", "Board ID", &self.board_id)
    }
}
