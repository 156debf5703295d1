//! MySQL driver, enabled with the `mysql` feature.
//!
//! MySQL commits implicitly around most DDL, so a failed step that already ran
//! a `CREATE` or `ALTER` keeps that change even though the version update is
//! rolled back. Re-running from the recorded version is still safe when the
//! step's DDL is written to be repeatable.

use std::fmt::Display;

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Value};
use schemaversion_common::{Error, Result, Version};
use schemaversion_config::{ConnectionParams, IdentifierValidator};
use tracing::info;

use crate::driver::{Connector, Session};

pub const MYSQL_DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlConnector;

impl MysqlConnector {
    fn opts(params: &ConnectionParams) -> Result<OptsBuilder> {
        let mut opts = OptsBuilder::new()
            .ip_or_hostname(Some(params.host.clone()))
            .tcp_port(params.port_or(MYSQL_DEFAULT_PORT))
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()))
            .db_name(Some(params.database.clone()));

        if let Some(charset) = &params.charset {
            IdentifierValidator::validate("charset", charset)?;
            opts = opts.init(vec![format!("SET NAMES {charset}")]);
        }
        Ok(opts)
    }
}

impl Connector for MysqlConnector {
    type Session = Conn;

    fn default_port(&self) -> Option<u16> {
        Some(MYSQL_DEFAULT_PORT)
    }

    fn connect(&self, params: &ConnectionParams) -> Result<Conn> {
        let opts = Self::opts(params)?;
        info!(
            "connecting to mysql at {}:{}/{}",
            params.host,
            params.port_or(MYSQL_DEFAULT_PORT),
            params.database
        );
        Conn::new(opts).map_err(|e| Error::Driver(e.to_string()))
    }
}

impl Session for Conn {
    /// Every result set is read to the end: with multi-statement steps an
    /// error in a later statement only shows up while iterating.
    fn execute(&mut self, sql: &str) -> Result<()> {
        let mut result = self
            .query_iter(sql)
            .map_err(|e| Error::Driver(e.to_string()))?;
        while let Some(set) = result.iter() {
            drain_rows(set)?;
        }
        Ok(())
    }

    fn query_versions(&mut self, sql: &str) -> Result<Vec<Option<Version>>> {
        let mut result = self
            .query_iter(sql)
            .map_err(|e| Error::Driver(format!("failed to run query: {e}")))?;

        let mut versions = Vec::new();
        if let Some(set) = result.iter() {
            for row in drain_rows(set)? {
                versions.push(version_from_value(row.as_ref(0).cloned())?);
            }
        }
        while let Some(set) = result.iter() {
            drain_rows(set)?;
        }
        Ok(versions)
    }

    fn begin(&mut self) -> Result<()> {
        self.query_drop("START TRANSACTION")
            .map_err(|e| Error::Driver(format!("failed to begin transaction: {e}")))
    }

    fn commit(&mut self) -> Result<()> {
        self.query_drop("COMMIT")
            .map_err(|e| Error::Driver(format!("failed to commit: {e}")))
    }

    fn rollback(&mut self) -> Result<()> {
        self.query_drop("ROLLBACK")
            .map_err(|e| Error::Driver(format!("failed to roll back: {e}")))
    }
}

/// Collect a result set, stopping at the first failed row.
fn drain_rows<T, E: Display>(
    rows: impl IntoIterator<Item = std::result::Result<T, E>>,
) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| row.map_err(|e| Error::Driver(e.to_string())))
        .collect()
}

/// Convert the first column of a row without panicking on non-integer cells.
fn version_from_value(value: Option<Value>) -> Result<Option<Version>> {
    let value = value.ok_or_else(|| Error::Driver("query returned no columns".into()))?;
    mysql::from_value_opt::<Option<Version>>(value)
        .map_err(|e| Error::Driver(format!("version is not an integer: {e:?}")))
}
