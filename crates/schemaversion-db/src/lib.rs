pub mod driver;
pub mod history;
pub mod migrator;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

pub use driver::{Connector, Session, SessionTransaction};
pub use history::{MigrationHistory, MigrationStep};
pub use migrator::{MigrationReport, Migrator};
#[cfg(feature = "mysql")]
pub use crate::mysql::MysqlConnector;
pub use sqlite::SqliteConnector;
