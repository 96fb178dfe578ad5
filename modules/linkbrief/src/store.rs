use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{LinkbriefError, Result};
use crate::types::{IndexRecord, RecordStatus};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS index_records (
    url          TEXT PRIMARY KEY,
    label        TEXT NOT NULL,
    status       TEXT NOT NULL,
    summary      TEXT NOT NULL DEFAULT '',
    error_detail TEXT,
    updated_at   TEXT NOT NULL
);
"#;

/// The durable index of processed URLs.
///
/// SQLite keeps every upsert atomic and the file readable at all times, so an
/// interrupted run resumes from exactly the rows that were committed. All
/// writers go through one mutex-guarded connection.
pub struct ResultStore {
    conn: Mutex<Connection>,
}

impl ResultStore {
    /// Open the index, creating the file and schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Snapshot the whole index, keyed by URL.
    pub fn load(&self) -> Result<HashMap<String, IndexRecord>> {
        let conn = self.conn.lock().expect("result store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT url, label, status, summary, error_detail, updated_at
             FROM index_records",
        )?;

        let mut records = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        })?;

        for row in rows {
            let (url, label, status, summary, error_detail, updated_at) = row?;
            let status = RecordStatus::parse(&status).ok_or(LinkbriefError::CorruptRow {
                url: url.clone(),
                status,
            })?;
            records.insert(
                url.clone(),
                IndexRecord {
                    url,
                    label,
                    status,
                    summary,
                    error_detail,
                    updated_at,
                },
            );
        }

        Ok(records)
    }

    /// Insert or overwrite the row for a URL. Durable before returning.
    pub fn upsert(&self, record: &IndexRecord) -> Result<()> {
        let conn = self.conn.lock().expect("result store mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO index_records (url, label, status, summary, error_detail, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(url) DO UPDATE
              SET label        = excluded.label,
                  status       = excluded.status,
                  summary      = excluded.summary,
                  error_detail = excluded.error_detail,
                  updated_at   = excluded.updated_at
            "#,
            params![
                record.url,
                record.label,
                record.status.as_str(),
                record.summary,
                record.error_detail,
                record.updated_at,
            ],
        )?;
        debug!(url = record.url, status = %record.status, "Index row written");
        Ok(())
    }

    /// Number of rows in the index.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("result store mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM index_records", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkItem;

    fn open_temp() -> (tempfile::TempDir, ResultStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = ResultStore::open(&dir.path().join("index.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trips_records() {
        let (_dir, store) = open_temp();
        let item = WorkItem::new("https://a.example", "note A");
        let record = IndexRecord::done(&item, "One. Two. Three.".to_string());

        store.upsert(&record).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["https://a.example"], record);
    }

    #[test]
    fn upsert_overwrites_instead_of_duplicating() {
        let (_dir, store) = open_temp();
        let item = WorkItem::new("https://a.example", "note A");

        store.upsert(&IndexRecord::failed(&item, "boom")).unwrap();
        store
            .upsert(&IndexRecord::done(&item, "One. Two. Three.".to_string()))
            .unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let loaded = store.load().unwrap();
        assert_eq!(loaded["https://a.example"].status, RecordStatus::Done);
        assert_eq!(loaded["https://a.example"].error_detail, None);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("index.db");
        let item = WorkItem::new("https://a.example", "note A");

        {
            let store = ResultStore::open(&path).unwrap();
            store.upsert(&IndexRecord::skipped(&item)).unwrap();
        }

        let store = ResultStore::open(&path).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(
            loaded["https://a.example"].status,
            RecordStatus::SkippedNotMeaningful
        );
    }

    #[test]
    fn unknown_status_is_a_loud_error() {
        let (_dir, store) = open_temp();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO index_records (url, label, status, summary, updated_at)
                 VALUES ('https://a.example', '', 'pending', '', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        assert!(matches!(
            store.load(),
            Err(LinkbriefError::CorruptRow { .. })
        ));
    }
}
