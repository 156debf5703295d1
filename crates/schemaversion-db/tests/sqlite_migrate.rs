use std::path::Path;

use rusqlite::Connection;
use schemaversion_common::{Error, Version};
use schemaversion_config::ConnectionParams;
use schemaversion_db::{MigrationHistory, MigrationStep, Migrator, SqliteConnector};
use tempfile::TempDir;

/// Create a database file with an initialised version table and return its
/// connection params.
fn prepared_database(dir: &TempDir, version: Version) -> ConnectionParams {
    let path = dir.path().join("app.db");
    let mut conn = Connection::open(&path).expect("create database file");
    Migrator::default()
        .bootstrap_on(&mut conn, version)
        .expect("bootstrap version table");

    ConnectionParams::new("localhost", path.to_string_lossy(), "app", "secret")
}

fn recorded_version(path: &Path) -> Version {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT version FROM schemaversion", [], |row| row.get(0))
        .unwrap()
}

fn history() -> MigrationHistory {
    MigrationHistory::new(vec![
        MigrationStep::base(0),
        MigrationStep::new(1, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"),
        MigrationStep::new(2, "ALTER TABLE users ADD COLUMN email TEXT"),
        MigrationStep::new(
            3,
            "CREATE INDEX idx_users_email ON users(email);
             INSERT INTO users (name, email) VALUES ('admin', 'admin@example.com');",
        ),
    ])
    .unwrap()
}

#[test]
fn migrates_file_database_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let params = prepared_database(&dir, 0);
    let path = Path::new(&params.database).to_path_buf();
    let migrator = Migrator::default();

    let report = migrator
        .migrate_up(&SqliteConnector, &params, 2, &history())
        .unwrap();
    assert_eq!(report.applied, vec![1, 2]);
    assert_eq!(recorded_version(&path), 2);

    let report = migrator
        .migrate_up(&SqliteConnector, &params, 3, &history())
        .unwrap();
    assert_eq!(report.from, 2);
    assert_eq!(report.applied, vec![3]);
    assert_eq!(recorded_version(&path), 3);

    let conn = Connection::open(&path).unwrap();
    let email: String = conn
        .query_row("SELECT email FROM users WHERE name = 'admin'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(email, "admin@example.com");
}

#[test]
fn persisted_version_never_decreases_through_migrate_up() {
    let dir = tempfile::tempdir().unwrap();
    let params = prepared_database(&dir, 0);
    let path = Path::new(&params.database).to_path_buf();
    let migrator = Migrator::default();

    migrator
        .migrate_up(&SqliteConnector, &params, 3, &history())
        .unwrap();
    let report = migrator
        .migrate_up(&SqliteConnector, &params, 1, &history())
        .unwrap();

    assert!(report.is_noop());
    assert_eq!(recorded_version(&path), 3);
}

#[test]
fn missing_database_file_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db");
    let params = ConnectionParams::new("localhost", missing.to_string_lossy(), "app", "secret");

    let err = Migrator::default()
        .migrate_up(&SqliteConnector, &params, 1, &history())
        .unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(!missing.exists());
}

#[test]
fn file_that_is_not_a_database_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "schema notes, not a database\n".repeat(64)).unwrap();
    let params = ConnectionParams::new("localhost", path.to_string_lossy(), "", "");

    let err = Migrator::default()
        .migrate_up(&SqliteConnector, &params, 1, &history())
        .unwrap_err();
    assert!(matches!(&err, Error::Connection(m) if m.contains("not a sqlite database")));
}

#[test]
fn database_without_version_table_is_a_state_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE other (id INTEGER)")
        .unwrap();
    let params = ConnectionParams::new("localhost", path.to_string_lossy(), "", "");

    let err = Migrator::default()
        .migrate_up(&SqliteConnector, &params, 1, &history())
        .unwrap_err();
    assert!(matches!(err, Error::State(_)));
}

#[test]
fn failure_mid_run_is_resumable_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let params = prepared_database(&dir, 0);
    let path = Path::new(&params.database).to_path_buf();
    let migrator = Migrator::default();

    let broken = MigrationHistory::new(vec![
        MigrationStep::base(0),
        MigrationStep::new(1, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"),
        MigrationStep::new(2, "ALTER TABLE accounts ADD COLUMN email TEXT"),
    ])
    .unwrap();

    let err = migrator
        .migrate_up(&SqliteConnector, &params, 2, &broken)
        .unwrap_err();
    assert!(matches!(err, Error::Execution { version: 2, .. }));
    assert_eq!(recorded_version(&path), 1);

    let report = migrator
        .migrate_up(&SqliteConnector, &params, 2, &history())
        .unwrap();
    assert_eq!(report.applied, vec![2]);
    assert_eq!(recorded_version(&path), 2);
}
