//! Document store contracts.
//!
//! # Responsibility
//! - Define collection-scoped CRUD over flat attribute maps.
//! - Surface conditional-write outcomes (`AlreadyExists`, `NotFound`) as
//!   distinct errors from infrastructure failures.
//!
//! # Invariants
//! - `create` never overwrites; `update` and `delete` never create.
//! - Absence on read is `Ok(None)`, never an error.
//! - Infrastructure failures are never reported as absence.

use crate::db::DbError;
use crate::model::{AttributeMap, IndexSpec, ID_FIELD};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod patch;
pub mod sqlite;

pub use patch::UpdatePatch;
pub use sqlite::SqliteDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store failure.
#[derive(Debug)]
pub enum StoreError {
    /// Conditional create found a record with the same id.
    AlreadyExists { collection: String, id: String },
    /// Conditional update/delete found no record with the id.
    NotFound { collection: String, id: String },
    /// Attributes passed to `create` lack a string `id`.
    MissingId,
    /// A stored body could not be decoded as an attribute map.
    InvalidDocument { collection: String, message: String },
    /// Index field name cannot be used in a lookup expression.
    InvalidIndexField(String),
    /// Transport/engine failure.
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExists { collection, id } => {
                write!(f, "record `{id}` already exists in `{collection}`")
            }
            Self::NotFound { collection, id } => {
                write!(f, "record `{id}` not found in `{collection}`")
            }
            Self::MissingId => write!(f, "attributes have no string `{ID_FIELD}`"),
            Self::InvalidDocument {
                collection,
                message,
            } => write!(f, "invalid stored document in `{collection}`: {message}"),
            Self::InvalidIndexField(field) => write!(f, "invalid index field `{field}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Collection-scoped persistence for entity attribute maps.
pub trait DocumentStore {
    /// Inserts `attributes` only if no record with the same id exists.
    fn create(&self, collection: &str, attributes: AttributeMap) -> StoreResult<AttributeMap>;

    fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<AttributeMap>>;

    /// Returns at most `limit` records in store-defined order.
    fn list_all(&self, collection: &str, limit: u32) -> StoreResult<Vec<AttributeMap>>;

    /// Returns every record whose indexed field equals `value`.
    fn query_by_index(
        &self,
        collection: &str,
        index: &IndexSpec,
        value: &Value,
    ) -> StoreResult<Vec<AttributeMap>>;

    /// Merges `patch` into the existing record and returns the new state.
    fn update(&self, collection: &str, id: &str, patch: &UpdatePatch)
        -> StoreResult<AttributeMap>;

    /// Removes the record; `NotFound` when it does not exist.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn create(&self, collection: &str, attributes: AttributeMap) -> StoreResult<AttributeMap> {
        (**self).create(collection, attributes)
    }

    fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<AttributeMap>> {
        (**self).get_by_id(collection, id)
    }

    fn list_all(&self, collection: &str, limit: u32) -> StoreResult<Vec<AttributeMap>> {
        (**self).list_all(collection, limit)
    }

    fn query_by_index(
        &self,
        collection: &str,
        index: &IndexSpec,
        value: &Value,
    ) -> StoreResult<Vec<AttributeMap>> {
        (**self).query_by_index(collection, index, value)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &UpdatePatch,
    ) -> StoreResult<AttributeMap> {
        (**self).update(collection, id, patch)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        (**self).delete(collection, id)
    }
}

/// Reads the string id out of an attribute map.
pub fn document_id(attributes: &AttributeMap) -> StoreResult<&str> {
    attributes
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(StoreError::MissingId)
}
