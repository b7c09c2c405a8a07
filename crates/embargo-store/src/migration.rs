//! Schema setup for the SQLite key database.
//!
//! The schema version lives in SQLite's `user_version` pragma. Step `n` in
//! [`STEPS`] takes a database from version `n` to `n + 1`, and all pending
//! steps run inside one transaction.

use rusqlite::{Connection, Transaction};

use crate::error::{Result, StoreError};

/// Ordered schema steps.
const STEPS: &[&str] = &[
    // 1: one sealed key per collection, timestamps in Unix ms
    "CREATE TABLE collection_keys (
        collection_id TEXT PRIMARY KEY,
        secret_key    BLOB    NOT NULL CHECK (length(secret_key) = 32),
        created_at    INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL
    );",
];

/// Schema version a fully migrated database reports.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Read the schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the database up to [`latest_version`].
///
/// Safe to call on every open. A database written by a newer build is
/// refused rather than touched.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found = schema_version(conn)?;
    let latest = latest_version();

    if found > latest {
        return Err(StoreError::Migration(format!(
            "key database is at schema {found}, this build only knows up to {latest}"
        )));
    }
    if found == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in STEPS.iter().enumerate().skip(found as usize) {
        run_step(&tx, version as u32 + 1, sql)?;
    }
    tx.commit()?;

    tracing::debug!(from = found, to = latest, "migrated key database");
    Ok(())
}

fn run_step(tx: &Transaction<'_>, version: u32, sql: &str) -> Result<()> {
    tx.execute_batch(sql)
        .map_err(|e| StoreError::Migration(format!("step {version}: {e}")))?;
    tx.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        migrate(&mut conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert_eq!(tables(&conn), vec!["collection_keys".to_string()]);
    }

    #[test]
    fn test_rerun_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO collection_keys VALUES ('c-1', zeroblob(32), 1, 1)",
            [],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM collection_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();

        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration(_)));
        assert!(tables(&conn).is_empty());
    }

    #[test]
    fn test_short_keys_rejected_by_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let result = conn.execute(
            "INSERT INTO collection_keys VALUES ('c-1', zeroblob(16), 1, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
