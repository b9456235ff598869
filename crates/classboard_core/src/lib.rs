//! Persistence core for the classboard domain.
//!
//! Boards, courses, instructors, items, sessions and students are stored as
//! flat attribute maps in one document store, with conditional writes,
//! partial updates, secondary-index lookups and blob-backed item documents.

pub mod blob;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use blob::{
    BlobError, BlobGateway, BlobResult, LocalObjectStore, ObjectStore, UploadGrant,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::board::Board;
pub use model::course::Course;
pub use model::instructor::Instructor;
pub use model::item::Item;
pub use model::session::Session;
pub use model::student::Student;
pub use model::{AttributeMap, Entity, EntityKind, IndexSpec, Projection, ValidationError};
pub use repo::{
    Conflict, DocumentCleanup, ItemDeletion, ItemRepository, RepoError, RepoResult, Repository,
};
pub use service::{EntityService, ServiceError, ServiceResult};
pub use store::{DocumentStore, SqliteDocumentStore, StoreError, StoreResult, UpdatePatch};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
