//! Generic entity repository.
//!
//! # Responsibility
//! - Provide create/get/list/query/update/delete for any `Entity` type.
//! - Enforce unique indexed fields before writes.
//!
//! # Invariants
//! - `create` calls `Entity::validate()` before the conditional insert.
//! - `update` never touches `id`/`created_at` and always refreshes
//!   `updated_at` (see `UpdatePatch`).
//! - Decoded records must carry parseable timestamps with
//!   `created_at <= updated_at`.

use crate::config::CoreConfig;
use crate::model::clock::parse_timestamp;
use crate::model::course::Course;
use crate::model::instructor::Instructor;
use crate::model::item::Item;
use crate::model::session::Session;
use crate::model::student::Student;
use crate::model::{AttributeMap, Entity, IndexSpec};
use crate::repo::{normalize_list_limit, Conflict, RepoError, RepoResult, DEFAULT_LIST_LIMIT};
use crate::store::{document_id, DocumentStore, UpdatePatch};
use log::{info, warn};
use serde_json::Value;
use std::marker::PhantomData;

/// Repository for one entity type over a document store.
pub struct Repository<E, S> {
    store: S,
    collection: String,
    default_limit: u32,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: DocumentStore> Repository<E, S> {
    /// Uses the entity's default collection name.
    pub fn new(store: S) -> Self {
        Self::with_collection(store, E::KIND.default_collection())
    }

    pub fn with_collection(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            default_limit: DEFAULT_LIST_LIMIT,
            _entity: PhantomData,
        }
    }

    /// Uses the configured collection name and default page size.
    pub fn from_config(store: S, config: &CoreConfig) -> Self {
        let mut repo = Self::with_collection(store, config.collection(E::KIND));
        repo.default_limit = config.list_limit_default;
        repo
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a new entity.
    ///
    /// # Errors
    /// - `Validation` when `entity.validate()` fails.
    /// - `AlreadyExists` on id collision or unique index collision.
    pub fn create(&self, entity: &E) -> RepoResult<E> {
        entity.validate()?;
        let attributes = entity.to_attributes()?;
        self.ensure_unique(&attributes, entity.id())?;

        let stored = self.store.create(&self.collection, attributes)?;
        info!(
            "event=entity_create module=repo status=ok kind={} id={}",
            E::KIND,
            entity.id()
        );
        self.decode(stored)
    }

    /// Returns the entity, or `None` when absent.
    pub fn get(&self, id: &str) -> RepoResult<Option<E>> {
        self.store
            .get_by_id(&self.collection, id)?
            .map(|attributes| self.decode(attributes))
            .transpose()
    }

    /// Returns at most `limit` entities (default page size when `None`).
    pub fn list(&self, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let limit = normalize_list_limit(limit, self.default_limit);
        self.decode_all(self.store.list_all(&self.collection, limit)?)
    }

    /// Exact-match lookup by index name (`CourseIndex`) or field (`course_id`).
    ///
    /// # Errors
    /// - `UnknownIndex` when the entity declares no such index.
    pub fn query_by_index(&self, name_or_field: &str, value: impl Into<Value>) -> RepoResult<Vec<E>> {
        let index = resolve_index::<E>(name_or_field)?;
        let records = self
            .store
            .query_by_index(&self.collection, index, &value.into())?;
        self.decode_all(records)
    }

    /// First match of an index lookup.
    pub fn find_one_by_index(
        &self,
        name_or_field: &str,
        value: impl Into<Value>,
    ) -> RepoResult<Option<E>> {
        Ok(self.query_by_index(name_or_field, value)?.into_iter().next())
    }

    /// Applies a sparse field-change map and returns the updated entity.
    ///
    /// Field values are not validated here; callers that accept arbitrary
    /// changes validate the merged entity first (see `EntityService`).
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`.
    /// - `Codec` when the merged record no longer decodes as `E`; nothing is
    ///   written.
    /// - `AlreadyExists` when a unique field would collide with another record.
    pub fn update(&self, id: &str, mut changes: AttributeMap) -> RepoResult<E> {
        E::prepare_changes(&mut changes);
        let patch = UpdatePatch::compile(changes);

        let mut candidate = self
            .store
            .get_by_id(&self.collection, id)?
            .ok_or_else(|| RepoError::NotFound {
                collection: self.collection.clone(),
                id: id.to_string(),
            })?;
        patch.apply_to(&mut candidate);
        if let Err(err) = E::from_attributes(candidate) {
            warn!(
                "event=entity_update module=repo status=rejected reason=shape kind={} id={id}",
                E::KIND
            );
            return Err(err.into());
        }

        self.ensure_unique(patch.assignments(), id)?;

        let updated = self.store.update(&self.collection, id, &patch)?;
        info!(
            "event=entity_update module=repo status=ok kind={} id={id} fields={}",
            E::KIND,
            patch.touched_fields().collect::<Vec<_>>().join(",")
        );
        self.decode(updated)
    }

    /// Removes the record.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`, including a repeated delete.
    pub fn delete(&self, id: &str) -> RepoResult<()> {
        self.store.delete(&self.collection, id)?;
        info!(
            "event=entity_delete module=repo status=ok kind={} id={id}",
            E::KIND
        );
        Ok(())
    }

    fn ensure_unique(&self, attributes: &AttributeMap, own_id: &str) -> RepoResult<()> {
        for index in E::INDEXES.iter().filter(|index| index.unique) {
            let Some(value) = attributes.get(index.field).filter(|value| !value.is_null()) else {
                continue;
            };
            let holders = self.store.query_by_index(&self.collection, index, value)?;
            let taken = holders
                .iter()
                .any(|holder| document_id(holder).map_or(true, |id| id != own_id));
            if taken {
                warn!(
                    "event=unique_check module=repo status=conflict kind={} index={}",
                    E::KIND,
                    index.name
                );
                return Err(RepoError::AlreadyExists {
                    collection: self.collection.clone(),
                    conflict: Conflict::IndexedField {
                        index: index.name,
                        field: index.field,
                    },
                });
            }
        }
        Ok(())
    }

    fn decode_all(&self, records: Vec<AttributeMap>) -> RepoResult<Vec<E>> {
        records
            .into_iter()
            .map(|attributes| self.decode(attributes))
            .collect()
    }

    fn decode(&self, attributes: AttributeMap) -> RepoResult<E> {
        let entity = E::from_attributes(attributes)
            .map_err(|err| RepoError::InvalidData(format!("{}: {err}", self.collection)))?;

        let created = parse_timestamp(entity.created_at());
        let updated = parse_timestamp(entity.updated_at());
        match (created, updated) {
            (Some(created), Some(updated)) if created <= updated => Ok(entity),
            (Some(_), Some(_)) => Err(RepoError::InvalidData(format!(
                "{} `{}` has created_at after updated_at",
                self.collection,
                entity.id()
            ))),
            _ => Err(RepoError::InvalidData(format!(
                "{} `{}` has unparseable timestamps",
                self.collection,
                entity.id()
            ))),
        }
    }
}

fn resolve_index<E: Entity>(name_or_field: &str) -> RepoResult<&'static IndexSpec> {
    E::index(name_or_field).ok_or_else(|| RepoError::UnknownIndex(name_or_field.trim().to_string()))
}

impl<S: DocumentStore> Repository<Course, S> {
    pub fn list_by_instructor(&self, instructor_id: &str) -> RepoResult<Vec<Course>> {
        self.query_by_index(crate::model::course::INSTRUCTOR_INDEX.name, instructor_id)
    }
}

impl<S: DocumentStore> Repository<Instructor, S> {
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Instructor>> {
        self.find_one_by_index(crate::model::instructor::EMAIL_INDEX.name, email)
    }
}

impl<S: DocumentStore> Repository<Item, S> {
    pub fn list_by_board(&self, board_id: &str) -> RepoResult<Vec<Item>> {
        self.query_by_index(crate::model::item::BOARD_INDEX.name, board_id)
    }
}

impl<S: DocumentStore> Repository<Session, S> {
    pub fn list_by_course(&self, course_id: &str) -> RepoResult<Vec<Session>> {
        self.query_by_index(crate::model::session::COURSE_INDEX.name, course_id)
    }

    pub fn list_by_board(&self, board_id: &str) -> RepoResult<Vec<Session>> {
        self.query_by_index(crate::model::session::BOARD_INDEX.name, board_id)
    }
}

impl<S: DocumentStore> Repository<Student, S> {
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.find_one_by_index(crate::model::student::EMAIL_INDEX.name, email)
    }
}
