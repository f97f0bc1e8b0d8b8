//! SQLite-backed document store
//!
//! Records are schema-less JSON objects grouped into collections and keyed
//! by a business identifier. Writes are last-write-wins: an upsert replaces
//! the body and bumps `updated_at` while `created_at` is kept.

mod queries;
mod schema;

pub use queries::Filter;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::core::collection::Collection;
use crate::core::config::DatabaseTarget;
use crate::core::error::{ImsError, ImsResult};

/// Current schema version - tables are rebuilt on mismatch
const SCHEMA_VERSION: i64 = 1;

/// A JSON document body
pub type Document = Map<String, Value>;

/// Result of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// One row of the import log
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportRecord {
    pub file_hash: String,
    pub file_path: String,
    pub collection: String,
    pub rows_imported: usize,
    pub imported_at: String,
}

/// The document store backed by SQLite
pub struct DocumentStore {
    conn: Connection,
    target: DatabaseTarget,
}

impl DocumentStore {
    /// Open (or create) the store at a resolved target
    pub fn open(target: &DatabaseTarget) -> ImsResult<Self> {
        let conn = match target {
            DatabaseTarget::Memory => Connection::open_in_memory()?,
            DatabaseTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path)?;
                // WAL keeps readers unblocked while an import is running
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
                conn
            }
        };
        let store = Self {
            conn,
            target: target.clone(),
        };
        store.ensure_schema()?;
        tracing::debug!(database = %store.target, "opened document store");
        Ok(store)
    }

    pub fn open_path(path: &Path) -> ImsResult<Self> {
        Self::open(&DatabaseTarget::File(path.to_path_buf()))
    }

    pub fn open_in_memory() -> ImsResult<Self> {
        Self::open(&DatabaseTarget::Memory)
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Run `f` inside one transaction; rolled back when it fails.
    ///
    /// Built on savepoints, so calls nest: an inner failure that the outer
    /// closure propagates rolls back everything.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> ImsResult<T>) -> ImsResult<T> {
        self.conn.execute_batch("SAVEPOINT ims_tx")?;
        match f(self) {
            Ok(v) => {
                self.conn.execute_batch("RELEASE ims_tx")?;
                Ok(v)
            }
            Err(e) => {
                let undo = "ROLLBACK TO ims_tx; RELEASE ims_tx";
                if let Err(rollback) = self.conn.execute_batch(undo) {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Insert or replace a document; the key field is always written into
    /// the body
    pub fn upsert(
        &self,
        collection: Collection,
        key: &str,
        mut body: Document,
    ) -> ImsResult<WriteOutcome> {
        body.insert(collection.key_field().to_string(), Value::from(key));
        let now = Utc::now().to_rfc3339();
        let existed = self.exists(collection, key)?;
        let json = serde_json::to_string(&body)?;
        self.conn.execute(
            r#"INSERT INTO documents (collection, key, body, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)
               ON CONFLICT(collection, key)
               DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"#,
            params![collection.as_str(), key, json, now],
        )?;
        Ok(if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    /// Insert a new document; an existing key is a validation error
    pub fn insert(&self, collection: Collection, key: &str, body: Document) -> ImsResult<()> {
        if self.exists(collection, key)? {
            return Err(ImsError::validation(format!(
                "{} '{}' already exists",
                collection.key_field(),
                key
            )));
        }
        self.upsert(collection, key, body)?;
        Ok(())
    }

    pub fn exists(&self, collection: Collection, key: &str) -> ImsResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, collection: Collection, key: &str) -> ImsResult<Option<Document>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| parse_body(&b)).transpose()
    }

    /// Merge `patch` into an existing document. Top-level keys are replaced,
    /// `null` removes a key, and the key field cannot change.
    pub fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: &Document,
    ) -> ImsResult<Document> {
        let key_field = collection.key_field();
        if let Some(new_key) = patch.get(key_field) {
            if new_key.as_str() != Some(key) {
                return Err(ImsError::validation(format!(
                    "{} cannot be changed",
                    key_field
                )));
            }
        }

        let mut doc = self
            .get(collection, key)?
            .ok_or_else(|| ImsError::not_found(collection.as_str(), key))?;
        for (k, v) in patch {
            if k == key_field {
                continue;
            }
            if v.is_null() {
                doc.remove(k);
            } else {
                doc.insert(k.clone(), v.clone());
            }
        }
        self.upsert(collection, key, doc.clone())?;
        Ok(doc)
    }

    /// Returns true when a document was removed
    pub fn delete(&self, collection: Collection, key: &str) -> ImsResult<bool> {
        let n = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection.as_str(), key],
        )?;
        Ok(n > 0)
    }

    /// Remove every document in a collection
    pub fn clear(&self, collection: Collection) -> ImsResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1",
            params![collection.as_str()],
        )?)
    }

    pub fn count(&self, collection: Collection) -> ImsResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Document counts for every collection, zero included
    pub fn collection_counts(&self) -> ImsResult<Vec<(Collection, usize)>> {
        Collection::ALL
            .into_iter()
            .map(|c| Ok((c, self.count(c)?)))
            .collect()
    }

    /// Every document in a collection, ordered by key
    pub fn all(&self, collection: Collection) -> ImsResult<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![collection.as_str()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(parse_body(&row?)?);
        }
        Ok(out)
    }

    pub fn record_import(&self, record: &ImportRecord) -> ImsResult<()> {
        self.conn.execute(
            r#"INSERT INTO imports (file_hash, file_path, collection, rows_imported, imported_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                record.file_hash,
                record.file_path,
                record.collection,
                record.rows_imported as i64,
                record.imported_at
            ],
        )?;
        Ok(())
    }

    /// Most recent import of a file with this hash into a collection
    pub fn last_import_for_hash(
        &self,
        file_hash: &str,
        collection: Collection,
    ) -> ImsResult<Option<ImportRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"SELECT file_hash, file_path, collection, rows_imported, imported_at
                   FROM imports WHERE file_hash = ?1 AND collection = ?2
                   ORDER BY id DESC LIMIT 1"#,
                params![file_hash, collection.as_str()],
                |row| {
                    Ok(ImportRecord {
                        file_hash: row.get(0)?,
                        file_path: row.get(1)?,
                        collection: row.get(2)?,
                        rows_imported: row.get::<_, i64>(3)? as usize,
                        imported_at: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Recent imports, newest first
    pub fn recent_imports(&self, limit: usize) -> ImsResult<Vec<ImportRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT file_hash, file_path, collection, rows_imported, imported_at
               FROM imports ORDER BY id DESC LIMIT ?1"#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(ImportRecord {
                file_hash: row.get(0)?,
                file_path: row.get(1)?,
                collection: row.get(2)?,
                rows_imported: row.get::<_, i64>(3)? as usize,
                imported_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn parse_body(raw: &str) -> ImsResult<Document> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(ImsError::Other("stored document is not a JSON object".into())),
    }
}

/// SHA-256 of a file, hex encoded
pub fn file_hash(path: &Path) -> ImsResult<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(v: Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_upsert_then_update_outcome() {
        let store = DocumentStore::open_in_memory().unwrap();
        let c = Collection::Suppliers;
        assert_eq!(
            store.upsert(c, "ACME", doc(json!({"phone": "1"}))).unwrap(),
            WriteOutcome::Created
        );
        assert_eq!(
            store.upsert(c, "ACME", doc(json!({"phone": "2"}))).unwrap(),
            WriteOutcome::Updated
        );
        let got = store.get(c, "ACME").unwrap().unwrap();
        assert_eq!(got["phone"], json!("2"));
        assert_eq!(got["supplier_name"], json!("ACME"));
        assert_eq!(store.count(c).unwrap(), 1);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert(Collection::Customers, "Bob", Document::new()).unwrap();
        let err = store
            .insert(Collection::Customers, "Bob", Document::new())
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_update_merges_and_removes() {
        let store = DocumentStore::open_in_memory().unwrap();
        let c = Collection::Materials;
        store
            .upsert(c, "M-1", doc(json!({"unit": "pcs", "remarks": "old"})))
            .unwrap();
        let updated = store
            .update(c, "M-1", &doc(json!({"unit": "box", "remarks": null})))
            .unwrap();
        assert_eq!(updated["unit"], json!("box"));
        assert!(!updated.contains_key("remarks"));
    }

    #[test]
    fn test_update_key_change_rejected() {
        let store = DocumentStore::open_in_memory().unwrap();
        let c = Collection::Materials;
        store.upsert(c, "M-1", Document::new()).unwrap();
        let err = store
            .update(c, "M-1", &doc(json!({"material_code": "M-2"})))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = DocumentStore::open_in_memory().unwrap();
        let err = store
            .update(Collection::Suppliers, "ghost", &Document::new())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_delete_and_clear() {
        let store = DocumentStore::open_in_memory().unwrap();
        let c = Collection::SalesOutbound;
        for k in ["a", "b", "c"] {
            store.upsert(c, k, Document::new()).unwrap();
        }
        assert!(store.delete(c, "a").unwrap());
        assert!(!store.delete(c, "a").unwrap());
        assert_eq!(store.clear(c).unwrap(), 2);
        assert_eq!(store.count(c).unwrap(), 0);
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.upsert(Collection::Suppliers, "X", Document::new()).unwrap();
        store.upsert(Collection::Customers, "X", Document::new()).unwrap();
        let counts = store.collection_counts().unwrap();
        assert_eq!(counts.len(), 8);
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 2);
    }

    #[test]
    fn test_transaction_rolls_back() {
        let store = DocumentStore::open_in_memory().unwrap();
        let result: ImsResult<()> = store.transaction(|s| {
            s.upsert(Collection::Suppliers, "A", Document::new())?;
            Err(ImsError::Other("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.count(Collection::Suppliers).unwrap(), 0);
    }

    #[test]
    fn test_nested_transaction_rolls_back_outer() {
        let store = DocumentStore::open_in_memory().unwrap();
        let result: ImsResult<()> = store.transaction(|s| {
            s.transaction(|inner| inner.upsert(Collection::Suppliers, "A", Document::new()))?;
            s.transaction(|inner| {
                inner.upsert(Collection::Customers, "B", Document::new())?;
                Err(ImsError::Other("boom".into()))
            })
        });
        assert!(result.is_err());
        assert_eq!(store.count(Collection::Suppliers).unwrap(), 0);
        assert_eq!(store.count(Collection::Customers).unwrap(), 0);

        store
            .transaction(|s| {
                s.transaction(|inner| inner.upsert(Collection::Suppliers, "C", Document::new()))
            })
            .unwrap();
        assert_eq!(store.count(Collection::Suppliers).unwrap(), 1);
    }

    #[test]
    fn test_import_log() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(store
            .last_import_for_hash("abc", Collection::Suppliers)
            .unwrap()
            .is_none());
        store
            .record_import(&ImportRecord {
                file_hash: "abc".into(),
                file_path: "x.xlsx".into(),
                collection: "suppliers".into(),
                rows_imported: 3,
                imported_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap();
        let rec = store
            .last_import_for_hash("abc", Collection::Suppliers)
            .unwrap()
            .unwrap();
        assert_eq!(rec.rows_imported, 3);
        assert!(store
            .last_import_for_hash("abc", Collection::Customers)
            .unwrap()
            .is_none());
        assert_eq!(store.recent_imports(5).unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_persists_and_rebuilds_on_version_change() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/ims.db");
        {
            let store = DocumentStore::open_path(&path).unwrap();
            store.upsert(Collection::Suppliers, "A", Document::new()).unwrap();
        }
        {
            let store = DocumentStore::open_path(&path).unwrap();
            assert_eq!(store.count(Collection::Suppliers).unwrap(), 1);
            store
                .conn
                .execute("UPDATE schema_version SET version = 999", [])
                .unwrap();
        }
        let store = DocumentStore::open_path(&path).unwrap();
        assert_eq!(store.count(Collection::Suppliers).unwrap(), 0);
    }

    #[test]
    fn test_file_hash_is_hex_sha256() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("f.txt");
        std::fs::write(&p, b"abc").unwrap();
        assert_eq!(
            file_hash(&p).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
