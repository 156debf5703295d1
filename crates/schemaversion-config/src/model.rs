use std::fmt;

use schemaversion_common::Result;
use serde::{Deserialize, Serialize};

use crate::validation::IdentifierValidator;

pub const DEFAULT_VERSION_TABLE: &str = "schemaversion";
pub const DEFAULT_VERSION_COLUMN: &str = "version";

/// Top-level configuration: where the database lives and where its schema
/// version is recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: ConnectionParams,
    pub version_table: VersionTableConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.version_table.validate()
    }
}

/// Credentials and location of the target database.
///
/// `port` falls back to the driver's standard port when unset. `charset` is
/// passed to drivers that support choosing a connection character set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub charset: Option<String>,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
            port: None,
            charset: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new("localhost", "", "", "")
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("charset", &self.charset)
            .finish()
    }
}

/// Names of the single-row table that records the current schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionTableConfig {
    pub table: String,
    pub column: String,
}

impl VersionTableConfig {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Both names end up interpolated into SQL, so they must be plain
    /// identifiers.
    pub fn validate(&self) -> Result<()> {
        IdentifierValidator::validate("version table", &self.table)?;
        IdentifierValidator::validate("version column", &self.column)
    }
}

impl Default for VersionTableConfig {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION_TABLE, DEFAULT_VERSION_COLUMN)
    }
}
