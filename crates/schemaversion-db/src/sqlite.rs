use rusqlite::{Connection, OpenFlags};
use schemaversion_common::{Error, Result, Version};
use schemaversion_config::ConnectionParams;
use tracing::{debug, info};

use crate::driver::{Connector, Session};

/// Connects to an existing SQLite database file named by
/// `ConnectionParams::database`.
///
/// The file is opened read-write without create: a missing file is a
/// connection failure rather than a fresh, versionless database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    type Session = Connection;

    fn default_port(&self) -> Option<u16> {
        None
    }

    fn connect(&self, params: &ConnectionParams) -> Result<Connection> {
        if params.database.is_empty() {
            return Err(Error::Driver("database path is empty".into()));
        }
        if params.port.is_some() || !params.user.is_empty() || !params.password.is_empty() {
            debug!("sqlite ignores host, port and credentials");
        }
        if let Some(charset) = &params.charset {
            debug!("sqlite ignores connection charset {charset}");
        }

        info!("opening sqlite database at {}", params.database);
        let conn = Connection::open_with_flags(
            &params.database,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::Driver(format!("failed to open database: {e}")))?;

        // Opening is lazy; reading the header catches files that are not databases.
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::Driver(format!("not a sqlite database: {e}")))?;
        Ok(conn)
    }
}

impl Session for Connection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.execute_batch(sql)
            .map_err(|e| Error::Driver(e.to_string()))
    }

    fn query_versions(&mut self, sql: &str) -> Result<Vec<Option<Version>>> {
        let mut stmt = self
            .prepare(sql)
            .map_err(|e| Error::Driver(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, Option<Version>>(0))
            .map_err(|e| Error::Driver(format!("failed to run query: {e}")))?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row.map_err(|e| Error::Driver(format!("failed to read row: {e}")))?);
        }
        Ok(versions)
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| Error::Driver(format!("failed to begin transaction: {e}")))
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| Error::Driver(format!("failed to commit: {e}")))
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| Error::Driver(format!("failed to roll back: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_versions_returns_first_column_per_row() {
        let mut conn = Connection::open_in_memory().unwrap();
        Session::execute(
            &mut conn,
            "CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (4); INSERT INTO t VALUES (NULL);",
        )
        .unwrap();

        let versions = conn.query_versions("SELECT v FROM t ORDER BY rowid").unwrap();
        assert_eq!(versions, vec![Some(4), None]);
    }

    #[test]
    fn query_versions_rejects_non_integer_values() {
        let mut conn = Connection::open_in_memory().unwrap();
        Session::execute(
            &mut conn,
            "CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('one');",
        )
        .unwrap();

        assert!(matches!(
            conn.query_versions("SELECT v FROM t"),
            Err(Error::Driver(_))
        ));
    }

    #[test]
    fn rollback_discards_uncommitted_work() {
        let mut conn = Connection::open_in_memory().unwrap();
        Session::execute(&mut conn, "CREATE TABLE t (v INTEGER)").unwrap();

        conn.begin().unwrap();
        Session::execute(&mut conn, "INSERT INTO t VALUES (1)").unwrap();
        conn.rollback().unwrap();

        assert!(conn.query_versions("SELECT v FROM t").unwrap().is_empty());
    }

    #[test]
    fn connect_requires_a_path() {
        let params = ConnectionParams::new("localhost", "", "", "");
        assert!(matches!(
            SqliteConnector.connect(&params),
            Err(Error::Driver(_))
        ));
        assert_eq!(SqliteConnector.default_port(), None);
    }
}
