/// SQLite storage adapter
///
/// Implements StoragePort for persisted results and KnowledgePort for the
/// local `medical_terms` table.
use crate::domain::models::{ProcessResult, StoredResult, TermDefinition};
use crate::domain::terms::{contains_pattern, LIKE_ESCAPE};
use crate::error::Result;
use crate::ports::knowledge::KnowledgePort;
use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite storage implementation
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<()> {
        use rusqlite_migration::{Migrations, M};

        let migrations = Migrations::new(vec![
            M::up(include_str!("../../../migrations/001_initial.sql")),
            M::up(include_str!("../../../migrations/002_seed_terms.sql")),
        ]);

        let mut conn = self.conn()?;
        migrations.to_latest(&mut conn)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn insert_term(&self, term: &str, definition: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO medical_terms (term, simple_definition) VALUES (?1, ?2)",
            params![term, definition],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    fn row_to_result(row: &Row<'_>) -> rusqlite::Result<(StoredResult, Option<String>)> {
        let result_json: String = row.get(3)?;
        let result: ProcessResult = serde_json::from_str(&result_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok((
            StoredResult {
                owner_uid: row.get(0)?,
                session_id: row.get(1)?,
                language: row.get(2)?,
                result,
                result_translated: None,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            },
            row.get(4)?,
        ))
    }

    fn attach_translation(
        (mut stored, translated_json): (StoredResult, Option<String>),
    ) -> Result<StoredResult> {
        stored.result_translated = translated_json
            .map(|json| serde_json::from_str(&json))
            .transpose()?;
        Ok(stored)
    }
}

const SELECT_RESULT: &str =
    "SELECT owner_uid, session_id, language, result_json, translated_json, created_at, updated_at
     FROM stored_results";

#[async_trait]
impl StoragePort for SqliteStorage {
    async fn save_result(&self, result: &StoredResult) -> Result<()> {
        let result_json = serde_json::to_string(&result.result)?;
        let translated_json = result
            .result_translated
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO stored_results
                (owner_uid, session_id, language, result_json, translated_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (owner_uid, session_id) DO UPDATE SET
                language = excluded.language,
                result_json = excluded.result_json,
                translated_json = excluded.translated_json,
                updated_at = excluded.updated_at",
            params![
                result.owner_uid,
                result.session_id,
                result.language,
                result_json,
                translated_json,
                result.created_at,
                result.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn get_result(&self, owner_uid: &str, session_id: &str) -> Result<Option<StoredResult>> {
        let row = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "{} WHERE owner_uid = ?1 AND session_id = ?2",
                SELECT_RESULT
            ))?;
            stmt.query_row(params![owner_uid, session_id], Self::row_to_result)
                .optional()?
        };

        row.map(Self::attach_translation).transpose()
    }

    async fn list_results(&self, owner_uid: &str, limit: Option<i32>) -> Result<Vec<StoredResult>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE owner_uid = ?1 ORDER BY updated_at DESC LIMIT ?2",
            SELECT_RESULT
        ))?;

        let rows = stmt.query_map(params![owner_uid, limit.unwrap_or(100)], Self::row_to_result)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(Self::attach_translation(row?)?);
        }

        Ok(results)
    }

    async fn delete_result(&self, owner_uid: &str, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM stored_results WHERE owner_uid = ?1 AND session_id = ?2",
            params![owner_uid, session_id],
        )?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgePort for SqliteStorage {
    async fn lookup_terms(&self, terms: &[String]) -> Result<Vec<TermDefinition>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let clauses = (1..=terms.len())
            .map(|i| format!("LOWER(term) LIKE ?{} ESCAPE '{}'", i, LIKE_ESCAPE))
            .collect::<Vec<_>>()
            .join(" OR ");
        let patterns = terms.iter().map(|t| contains_pattern(t));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT term, simple_definition FROM medical_terms WHERE {} ORDER BY id",
            clauses
        ))?;

        let rows = stmt.query_map(params_from_iter(patterns), |row| {
            Ok(TermDefinition {
                term: row.get(0)?,
                definition: row.get(1)?,
            })
        })?;

        let mut definitions = Vec::new();
        for row in rows {
            definitions.push(row?);
        }

        Ok(definitions)
    }

    fn source_name(&self) -> &'static str {
        "sqlite"
    }
}
