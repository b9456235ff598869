//! Generic entity use-case service.
//!
//! # Responsibility
//! - Provide the caller-facing CRUD entry points for one entity type.
//! - Reject empty updates and validate the merged entity before writing.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Sensitive fields are hashed before they reach the repository.
//! - Default reads use `Projection::Public`.

use crate::model::credential::hash_password;
use crate::model::{AttributeMap, Entity, Projection, UPDATED_AT_FIELD};
use crate::repo::{RepoError, Repository};
use crate::service::{ServiceError, ServiceResult};
use crate::store::patch::IMMUTABLE_FIELDS;
use crate::store::DocumentStore;
use log::debug;
use serde_json::Value;

pub struct EntityService<E, S> {
    repo: Repository<E, S>,
}

impl<E: Entity, S: DocumentStore> EntityService<E, S> {
    pub fn new(repo: Repository<E, S>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository<E, S> {
        &self.repo
    }

    pub fn create(&self, entity: &E) -> ServiceResult<E> {
        Ok(self.repo.create(entity)?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Option<E>> {
        Ok(self.repo.get(id)?)
    }

    /// Reads one record as an attribute map under `projection`.
    pub fn get_projected(&self, id: &str, projection: Projection) -> ServiceResult<Option<AttributeMap>> {
        self.repo
            .get(id)?
            .map(|entity| entity.project(projection).map_err(RepoError::from))
            .transpose()
            .map_err(ServiceError::from)
    }

    /// Lists records in the public projection.
    pub fn list(&self, limit: Option<u32>) -> ServiceResult<Vec<AttributeMap>> {
        self.repo
            .list(limit)?
            .iter()
            .map(|entity| {
                entity
                    .project(Projection::Public)
                    .map_err(|err| ServiceError::Repo(err.into()))
            })
            .collect()
    }

    pub fn query_by_index(&self, name_or_field: &str, value: impl Into<Value>) -> ServiceResult<Vec<E>> {
        Ok(self.repo.query_by_index(name_or_field, value)?)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    /// - `NoFieldsToUpdate` when nothing mutable remains after dropping
    ///   `id`, `created_at` and `updated_at`.
    /// - `InvalidChange` when a value cannot be decoded into the entity.
    /// - `Validation` when the merged entity fails validation.
    /// - `Repo(NotFound)` when the record does not exist.
    pub fn update_fields(&self, id: &str, changes: AttributeMap) -> ServiceResult<E> {
        let mut changes: AttributeMap = changes
            .into_iter()
            .filter(|(field, _)| {
                !IMMUTABLE_FIELDS.contains(&field.as_str()) && field != UPDATED_AT_FIELD
            })
            .collect();
        if changes.is_empty() {
            debug!(
                "event=entity_update module=service status=rejected reason=no_fields kind={} id={id}",
                E::KIND
            );
            return Err(ServiceError::NoFieldsToUpdate);
        }

        for field in E::SENSITIVE_FIELDS {
            if let Some(value) = changes.get_mut(*field) {
                let Value::String(plaintext) = value else {
                    return Err(ServiceError::InvalidChange(format!("{field} must be a string")));
                };
                *value = Value::String(hash_password(plaintext)?);
            }
        }

        let existing = self.repo.get(id)?.ok_or_else(|| RepoError::NotFound {
            collection: self.repo.collection().to_string(),
            id: id.to_string(),
        })?;

        let mut merged = existing.to_attributes().map_err(RepoError::from)?;
        for (field, value) in &changes {
            merged.insert(field.clone(), value.clone());
        }
        let candidate =
            E::from_attributes(merged).map_err(|err| ServiceError::InvalidChange(err.to_string()))?;
        candidate.validate()?;

        Ok(self.repo.update(id, changes)?)
    }

    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        Ok(self.repo.delete(id)?)
    }
}
