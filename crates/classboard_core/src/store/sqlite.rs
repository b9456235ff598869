//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist attribute maps as JSON bodies in the `documents` table.
//! - Map SQLite constraint and row-count outcomes onto conditional-write
//!   errors.
//!
//! # Invariants
//! - `create` relies on the `(collection, id)` primary key, never on a prior
//!   read.
//! - `update` reads and writes inside one `BEGIN IMMEDIATE` transaction.
//! - Index lookups use the same `json_extract` expression as the migration
//!   indexes.

use crate::model::{AttributeMap, IndexSpec};
use crate::store::{document_id, DocumentStore, StoreError, StoreResult, UpdatePatch};
use log::{debug, error, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{ffi, params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::Value;

/// Document store over a migrated SQLite connection.
#[derive(Clone, Copy)]
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Number of records stored in `collection`.
    pub fn count(&self, collection: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1;",
            [collection],
            |row| row.get(0),
        )?;
        row_count(collection, count)
    }

    fn collect_bodies(
        &self,
        collection: &str,
        sql: &str,
        bind: &[SqlValue],
    ) -> StoreResult<Vec<AttributeMap>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            records.push(parse_body(collection, &body)?);
        }
        Ok(records)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn create(&self, collection: &str, attributes: AttributeMap) -> StoreResult<AttributeMap> {
        let id = document_id(&attributes)?.to_string();
        let body = encode_body(collection, &attributes)?;

        match self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id, body],
        ) {
            Ok(_) => {
                debug!("event=doc_create module=store status=ok collection={collection} id={id}");
                Ok(attributes)
            }
            Err(err) if is_primary_key_conflict(&err) => {
                info!(
                    "event=doc_create module=store status=conflict collection={collection} id={id}"
                );
                Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id,
                })
            }
            Err(err) => {
                error!(
                    "event=doc_create module=store status=error collection={collection} id={id} error={err}"
                );
                Err(err.into())
            }
        }
    }

    fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<AttributeMap>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .inspect_err(|err| {
                error!(
                    "event=doc_get module=store status=error collection={collection} id={id} error={err}"
                );
            })?;

        body.map(|body| parse_body(collection, &body)).transpose()
    }

    fn list_all(&self, collection: &str, limit: u32) -> StoreResult<Vec<AttributeMap>> {
        let records = self.collect_bodies(
            collection,
            "SELECT body FROM documents WHERE collection = ?1 LIMIT ?2;",
            &[
                SqlValue::Text(collection.to_string()),
                SqlValue::Integer(i64::from(limit)),
            ],
        )?;
        debug!(
            "event=doc_list module=store status=ok collection={collection} limit={limit} count={}",
            records.len()
        );
        Ok(records)
    }

    fn query_by_index(
        &self,
        collection: &str,
        index: &IndexSpec,
        value: &Value,
    ) -> StoreResult<Vec<AttributeMap>> {
        let expression = index_expression(index.field)?;
        let Some(bound) = json_to_sql(value) else {
            // Objects, arrays and null never equal a scalar index value.
            return Ok(Vec::new());
        };

        let sql = format!("SELECT body FROM documents WHERE collection = ?1 AND {expression} = ?2;");
        let records = self.collect_bodies(
            collection,
            &sql,
            &[SqlValue::Text(collection.to_string()), bound],
        )?;
        debug!(
            "event=doc_query module=store status=ok collection={collection} index={} count={}",
            index.name,
            records.len()
        );
        Ok(records)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &UpdatePatch,
    ) -> StoreResult<AttributeMap> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(existing) = existing else {
            debug!("event=doc_update module=store status=not_found collection={collection} id={id}");
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut record = parse_body(collection, &existing)?;
        patch.apply_to(&mut record);
        let body = encode_body(collection, &record)?;

        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2;",
            params![collection, id, body],
        )?;
        tx.commit().inspect_err(|err| {
            error!(
                "event=doc_update module=store status=error collection={collection} id={id} error={err}"
            );
        })?;

        debug!(
            "event=doc_update module=store status=ok collection={collection} id={id} fields={}",
            patch.touched_fields().collect::<Vec<_>>().join(",")
        );
        Ok(record)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
        )?;

        if changed == 0 {
            debug!("event=doc_delete module=store status=not_found collection={collection} id={id}");
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        debug!("event=doc_delete module=store status=ok collection={collection} id={id}");
        Ok(())
    }
}

fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn row_count(collection: &str, raw: i64) -> StoreResult<u64> {
    u64::try_from(raw).map_err(|_| StoreError::InvalidDocument {
        collection: collection.to_string(),
        message: format!("row count {raw} is negative"),
    })
}

fn encode_body(collection: &str, attributes: &AttributeMap) -> StoreResult<String> {
    serde_json::to_string(attributes).map_err(|err| StoreError::InvalidDocument {
        collection: collection.to_string(),
        message: err.to_string(),
    })
}

fn parse_body(collection: &str, body: &str) -> StoreResult<AttributeMap> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::InvalidDocument {
            collection: collection.to_string(),
            message: "body is not a JSON object".to_string(),
        }),
        Err(err) => Err(StoreError::InvalidDocument {
            collection: collection.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Builds the `json_extract` expression for an index field.
///
/// Field names are inlined (not bound) so the planner can match the
/// expression indexes created by migration.
fn index_expression(field: &str) -> StoreResult<String> {
    if !is_valid_field_name(field) {
        return Err(StoreError::InvalidIndexField(field.to_string()));
    }
    Ok(format!("json_extract(body, '$.{field}')"))
}

fn is_valid_field_name(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Converts a JSON scalar into the SQL value `json_extract` yields for it.
fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(text) => Some(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Some(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
