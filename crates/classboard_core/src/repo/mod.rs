//! Repository layer over the document store.
//!
//! # Responsibility
//! - Compose store, entity codec and static index table per entity type.
//! - Translate store outcomes into semantic errors (`AlreadyExists`,
//!   `NotFound`) separate from infrastructure failures.
//!
//! # Invariants
//! - `create` validates the entity before any store call.
//! - Persisted state that cannot be decoded is reported, never masked.
//! - Unique index checks are check-then-write and not atomic.

use crate::blob::BlobError;
use crate::model::{CodecError, ValidationError};
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity_repo;
pub mod item_repo;

pub use entity_repo::Repository;
pub use item_repo::{DocumentCleanup, ItemDeletion, ItemRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Page size used when the caller gives none.
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Largest page `list` will ask the store for.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// What a rejected create/update collided with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Another record already has this id.
    Id(String),
    /// A unique indexed field already holds this value on another record.
    IndexedField {
        index: &'static str,
        field: &'static str,
    },
}

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    AlreadyExists {
        collection: String,
        conflict: Conflict,
    },
    NotFound {
        collection: String,
        id: String,
    },
    /// Index name/field not declared by the entity.
    UnknownIndex(String),
    /// Entity could not be encoded into attributes.
    Codec(CodecError),
    Store(StoreError),
    Blob(BlobError),
    /// Stored record does not decode into a valid entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AlreadyExists {
                collection,
                conflict: Conflict::Id(id),
            } => write!(f, "`{collection}` already contains id `{id}`"),
            Self::AlreadyExists {
                collection,
                conflict: Conflict::IndexedField { field, .. },
            } => write!(f, "`{collection}` already contains a record with this {field}"),
            Self::NotFound { collection, id } => write!(f, "`{collection}` has no record `{id}`"),
            Self::UnknownIndex(name) => write!(f, "unknown index `{name}`"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Blob(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Blob(err) => Some(err),
            Self::AlreadyExists { .. }
            | Self::NotFound { .. }
            | Self::UnknownIndex(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<BlobError> for RepoError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::AlreadyExists { collection, id } => Self::AlreadyExists {
                collection,
                conflict: Conflict::Id(id),
            },
            StoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            other => Self::Store(other),
        }
    }
}

/// Resolves the page size for `list`: `requested` or `default`, clamped to
/// `1..=MAX_LIST_LIMIT`.
pub fn normalize_list_limit(requested: Option<u32>, default: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}
