//! Partial update compiler.
//!
//! Turns a sparse field-change map into the merge applied by
//! `DocumentStore::update`.
//!
//! # Invariants
//! - `id` and `created_at` are dropped from the input, never applied.
//! - `updated_at` is always stamped, even for an empty change set.
//! - Merge is replace-by-field; unspecified fields stay untouched.
//! - No schema or type checks happen here.

use crate::model::clock::now_timestamp;
use crate::model::{AttributeMap, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use serde_json::Value;

/// Fields a patch can never assign.
pub const IMMUTABLE_FIELDS: &[&str] = &[ID_FIELD, CREATED_AT_FIELD];

/// Compiled replace-by-field update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePatch {
    assignments: AttributeMap,
    updated_at: String,
}

impl UpdatePatch {
    /// Compiles `changes` with the current audit timestamp.
    pub fn compile(changes: AttributeMap) -> Self {
        Self::compile_at(changes, now_timestamp())
    }

    /// Compiles `changes` stamping `updated_at` with the given value.
    pub fn compile_at(changes: AttributeMap, updated_at: impl Into<String>) -> Self {
        let assignments = changes
            .into_iter()
            .filter(|(field, _)| {
                !IMMUTABLE_FIELDS.contains(&field.as_str()) && field != UPDATED_AT_FIELD
            })
            .collect();
        Self {
            assignments,
            updated_at: updated_at.into(),
        }
    }

    /// Caller fields that survive compilation (without `updated_at`).
    pub fn assignments(&self) -> &AttributeMap {
        &self.assignments
    }

    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    /// Whether any caller field survived compilation.
    pub fn has_field_changes(&self) -> bool {
        !self.assignments.is_empty()
    }

    /// Names of every field the patch writes, `updated_at` last.
    pub fn touched_fields(&self) -> impl Iterator<Item = &str> {
        self.assignments
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(UPDATED_AT_FIELD))
    }

    /// Merges the patch into an existing record.
    pub fn apply_to(&self, record: &mut AttributeMap) {
        for (field, value) in &self.assignments {
            record.insert(field.clone(), value.clone());
        }
        record.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(self.updated_at.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::UpdatePatch;
    use crate::model::AttributeMap;
    use serde_json::{json, Value};

    fn attributes(value: Value) -> AttributeMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn record() -> AttributeMap {
        attributes(json!({
            "id": "b-1",
            "title": "Math",
            "active": true,
            "created_at": "2026-01-01T00:00:00.000000Z",
            "updated_at": "2026-01-01T00:00:00.000000Z"
        }))
    }

    #[test]
    fn drops_immutable_fields() {
        let patch = UpdatePatch::compile_at(
            attributes(json!({
                "id": "hijack",
                "created_at": "1999-01-01T00:00:00.000000Z",
                "title": "Algebra"
            })),
            "2026-02-01T00:00:00.000000Z",
        );
        let mut target = record();
        patch.apply_to(&mut target);

        assert_eq!(target["id"], "b-1");
        assert_eq!(target["created_at"], "2026-01-01T00:00:00.000000Z");
        assert_eq!(target["title"], "Algebra");
        assert_eq!(target["active"], true);
    }

    #[test]
    fn empty_change_set_still_stamps_updated_at() {
        let patch = UpdatePatch::compile_at(AttributeMap::new(), "2026-03-01T00:00:00.000000Z");
        assert!(!patch.has_field_changes());

        let before = record();
        let mut after = before.clone();
        patch.apply_to(&mut after);

        assert_eq!(after["updated_at"], "2026-03-01T00:00:00.000000Z");
        for field in ["id", "title", "active", "created_at"] {
            assert_eq!(after[field], before[field], "{field} must not change");
        }
    }

    #[test]
    fn caller_updated_at_is_overridden() {
        let patch = UpdatePatch::compile_at(
            attributes(json!({ "updated_at": "1970-01-01T00:00:00.000000Z" })),
            "2026-04-01T00:00:00.000000Z",
        );
        assert!(!patch.has_field_changes());
        assert_eq!(
            patch.touched_fields().collect::<Vec<_>>(),
            vec!["updated_at"]
        );
    }

    #[test]
    fn compile_uses_audit_clock() {
        let first = UpdatePatch::compile(AttributeMap::new());
        let second = UpdatePatch::compile(AttributeMap::new());
        assert!(second.updated_at() > first.updated_at());
    }
}
