//! Database schema initialization

use super::{DocumentStore, SCHEMA_VERSION};
use crate::core::error::ImsResult;

impl DocumentStore {
    /// Create tables when missing; rebuild them on a version mismatch
    pub(super) fn ensure_schema(&self) -> ImsResult<()> {
        let current: i64 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current == SCHEMA_VERSION {
            return Ok(());
        }
        if current != 0 {
            tracing::warn!(
                found = current,
                expected = SCHEMA_VERSION,
                "store schema changed, rebuilding tables"
            );
            self.conn.execute_batch(
                r#"
                DROP TABLE IF EXISTS schema_version;
                DROP TABLE IF EXISTS documents;
                DROP TABLE IF EXISTS imports;
                "#,
            )?;
        }
        self.init_schema()
    }

    fn init_schema(&self) -> ImsResult<()> {
        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per business record; body is the JSON document
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

            -- Import log keyed by source file hash
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_hash TEXT NOT NULL,
                file_path TEXT NOT NULL,
                collection TEXT NOT NULL,
                rows_imported INTEGER NOT NULL,
                imported_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_imports_hash ON imports(file_hash, collection);
            "#,
        )?;
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }
}
