//! Entity model shared by every classroom collection.
//!
//! # Responsibility
//! - Define the `Entity` contract consumed by the generic repository.
//! - Own the flat attribute codec (`to_attributes` / `from_attributes`).
//! - Declare static secondary-index metadata per entity type.
//!
//! # Invariants
//! - Every entity carries `id`, `created_at` and `updated_at` attributes.
//! - `id` and `created_at` never change after creation.
//! - Sensitive fields are dropped from the default projection.
//!
//! # See also
//! - `crate::store` for how attribute maps are persisted.

pub mod board;
pub mod clock;
pub mod course;
pub mod credential;
pub mod instructor;
pub mod item;
pub mod session;
pub mod student;
pub mod validation;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use validation::ValidationError;

/// Flat field mapping persisted for one entity record.
pub type AttributeMap = serde_json::Map<String, Value>;

/// Attribute name of the stable record identifier.
pub const ID_FIELD: &str = "id";
/// Attribute name of the creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Attribute name of the last-modification timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// The six entity collections managed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Board,
    Course,
    Instructor,
    Item,
    Session,
    Student,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Board,
        Self::Course,
        Self::Instructor,
        Self::Item,
        Self::Session,
        Self::Student,
    ];

    /// Singular name used in log events and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Course => "course",
            Self::Instructor => "instructor",
            Self::Item => "item",
            Self::Session => "session",
            Self::Student => "student",
        }
    }

    /// Collection name used when configuration does not override it.
    pub fn default_collection(self) -> &'static str {
        match self {
            Self::Board => "boards",
            Self::Course => "courses",
            Self::Instructor => "instructors",
            Self::Item => "items",
            Self::Session => "sessions",
            Self::Student => "students",
        }
    }

    /// Environment variable that overrides the collection name.
    pub fn collection_env_var(self) -> &'static str {
        match self {
            Self::Board => "BOARDS_TABLE",
            Self::Course => "COURSES_TABLE",
            Self::Instructor => "INSTRUCTORS_TABLE",
            Self::Item => "ITEMS_TABLE",
            Self::Session => "SESSIONS_TABLE",
            Self::Student => "STUDENTS_TABLE",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static declaration of one secondary index (`name -> field`).
///
/// Lookups are exact-match equality on a single field. `unique` marks indexes
/// whose value the repository checks for collisions before writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub const fn new(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            unique: false,
        }
    }

    pub const fn unique(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            unique: true,
        }
    }

    /// Returns whether `name_or_field` addresses this index.
    pub fn matches(&self, name_or_field: &str) -> bool {
        let needle = name_or_field.trim();
        self.name == needle || self.field == needle
    }
}

/// Which fields an entity exposes when projected to attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Everything except `Entity::SENSITIVE_FIELDS`.
    #[default]
    Public,
    /// Full record including credential hashes.
    WithCredentials,
}

/// Attribute-map conversion failure.
#[derive(Debug)]
pub enum CodecError {
    /// Encoded entity was not a JSON object.
    NotAnObject(EntityKind),
    /// Serde conversion failed.
    Serde {
        kind: EntityKind,
        source: serde_json::Error,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject(kind) => write!(f, "{kind} did not encode to an attribute map"),
            Self::Serde { kind, source } => write!(f, "invalid {kind} attributes: {source}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotAnObject(_) => None,
            Self::Serde { source, .. } => Some(source),
        }
    }
}

/// Typed record owned by exactly one repository.
///
/// The codec defaults go through `serde`, so an entity only needs its derive
/// attributes, identity accessors, index table and validation rules.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;
    const INDEXES: &'static [IndexSpec] = &[];
    const SENSITIVE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;
    fn created_at(&self) -> &str;
    fn updated_at(&self) -> &str;

    /// Field-level validation rules (pass, or fail with a message).
    fn validate(&self) -> Result<(), ValidationError>;

    /// Adjusts a sparse change set before it is compiled into a patch, so
    /// dependent fields stay consistent with the ones being changed.
    fn prepare_changes(_changes: &mut AttributeMap) {}

    fn to_attributes(&self) -> Result<AttributeMap, CodecError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CodecError::NotAnObject(Self::KIND)),
            Err(source) => Err(CodecError::Serde {
                kind: Self::KIND,
                source,
            }),
        }
    }

    fn from_attributes(attributes: AttributeMap) -> Result<Self, CodecError> {
        serde_json::from_value(Value::Object(attributes)).map_err(|source| CodecError::Serde {
            kind: Self::KIND,
            source,
        })
    }

    fn project(&self, projection: Projection) -> Result<AttributeMap, CodecError> {
        let mut attributes = self.to_attributes()?;
        if projection == Projection::Public {
            for field in Self::SENSITIVE_FIELDS {
                attributes.remove(*field);
            }
        }
        Ok(attributes)
    }

    /// Resolves an index by name (`EmailIndex`) or by field (`email`).
    fn index(name_or_field: &str) -> Option<&'static IndexSpec> {
        Self::INDEXES.iter().find(|index| index.matches(name_or_field))
    }
}

/// Generates a fresh opaque entity id.
pub fn new_entity_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn default_active() -> bool {
    true
}
