use schemaversion_common::{Error, Result, Version};
use schemaversion_config::{AppConfig, ConnectionParams, VersionTableConfig};
use tracing::{debug, info, warn};

use crate::driver::{Connector, Session, SessionTransaction};
use crate::history::{MigrationHistory, MigrationStep};

/// Outcome of a migration run. `applied` lists the steps run, in the order
/// they ran; for a downgrade these are the reverted versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: Version,
    pub to: Version,
    pub applied: Vec<Version>,
}

impl MigrationReport {
    fn unchanged(version: Version) -> Self {
        Self {
            from: version,
            to: version,
            applied: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Moves a database between versions of a [`MigrationHistory`], keeping the
/// single-row version table in step with what has been applied.
///
/// Every step runs in its own transaction together with the version update,
/// so the recorded version never gets ahead of the schema. A failure aborts
/// the run and leaves the version at the last committed step.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    table: VersionTableConfig,
}

impl Migrator {
    pub fn new(table: VersionTableConfig) -> Result<Self> {
        table.validate()?;
        Ok(Self { table })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.version_table.clone())
    }

    pub fn version_table(&self) -> &VersionTableConfig {
        &self.table
    }

    /// Connect with `params` and apply every step above the recorded version
    /// up to and including `target`.
    ///
    /// A `target` below the recorded version applies nothing; use
    /// [`migrate_down`](Self::migrate_down) to go backwards.
    pub fn migrate_up<C: Connector>(
        &self,
        connector: &C,
        params: &ConnectionParams,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<MigrationReport> {
        let mut session = self.connect(connector, params)?;
        self.migrate_up_on(&mut session, target, history)
    }

    pub fn migrate_up_on<S: Session + ?Sized>(
        &self,
        session: &mut S,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<MigrationReport> {
        let current = self.current_version_on(session)?;
        check_versions(current, target, history)?;

        if target <= current {
            info!("schema at version {current}, nothing to apply for target {target}");
            return Ok(MigrationReport::unchanged(current));
        }

        info!("migrating schema from version {current} to {target}");
        let mut report = MigrationReport::unchanged(current);
        for step in history.pending_up(current, target) {
            self.apply_step(session, step.version, step.up_sql(), step.version)?;
            info!("applied schema version {}", step.version);
            report.applied.push(step.version);
            report.to = step.version;
        }
        Ok(report)
    }

    /// Connect with `params` and revert every step above `target` down to the
    /// recorded version, newest first, running each step's down SQL.
    ///
    /// Fails with [`Error::Irreversible`] before touching the schema when any
    /// step in range has no down SQL. A `target` at or above the recorded
    /// version reverts nothing.
    pub fn migrate_down<C: Connector>(
        &self,
        connector: &C,
        params: &ConnectionParams,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<MigrationReport> {
        let mut session = self.connect(connector, params)?;
        self.migrate_down_on(&mut session, target, history)
    }

    pub fn migrate_down_on<S: Session + ?Sized>(
        &self,
        session: &mut S,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<MigrationReport> {
        let current = self.current_version_on(session)?;
        let plan = down_plan(current, target, history)?;

        if plan.is_empty() {
            info!("schema at version {current}, nothing to revert for target {target}");
            return Ok(MigrationReport::unchanged(current));
        }

        info!("reverting schema from version {current} to {target}");
        let mut report = MigrationReport::unchanged(current);
        for (step, previous) in plan {
            self.apply_step(session, step.version, step.down_sql(), previous)?;
            info!("reverted schema version {}", step.version);
            report.applied.push(step.version);
            report.to = previous;
        }
        Ok(report)
    }

    /// Versions `migrate_up` would apply from `current`, without a database.
    pub fn plan_up(
        &self,
        current: Version,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<Vec<Version>> {
        check_versions(current, target, history)?;
        Ok(history
            .pending_up(current, target)
            .map(|s| s.version)
            .collect())
    }

    /// Versions `migrate_down` would revert from `current`, without a database.
    pub fn plan_down(
        &self,
        current: Version,
        target: Version,
        history: &MigrationHistory,
    ) -> Result<Vec<Version>> {
        Ok(down_plan(current, target, history)?
            .into_iter()
            .map(|(s, _)| s.version)
            .collect())
    }

    /// Read the recorded schema version. The table must hold exactly one
    /// non-NULL integer.
    pub fn current_version_on<S: Session + ?Sized>(&self, session: &mut S) -> Result<Version> {
        let VersionTableConfig { table, column } = &self.table;
        let rows = session
            .query_versions(&self.select_sql())
            .map_err(|e| {
                classify(e, |m| {
                    Error::State(format!("failed to read {table}.{column}: {m}"))
                })
            })?;

        match rows.as_slice() {
            [Some(version)] => Ok(*version),
            [None] => Err(Error::State(format!("{table}.{column} is NULL"))),
            [] => Err(Error::State(format!("{table} is empty"))),
            rows => Err(Error::State(format!(
                "{table} has {} rows, expected exactly one",
                rows.len()
            ))),
        }
    }

    /// Create the version table if it is missing and record `base` when it is
    /// empty. Returns the recorded version; an initialised table is left as is.
    pub fn bootstrap_on<S: Session + ?Sized>(
        &self,
        session: &mut S,
        base: Version,
    ) -> Result<Version> {
        let VersionTableConfig { table, column } = &self.table;
        let state_error = |e: Error| {
            classify(e, |m| {
                Error::State(format!("failed to initialise {table}: {m}"))
            })
        };

        session
            .execute(&format!(
                "CREATE TABLE IF NOT EXISTS {table} ({column} INTEGER NOT NULL)"
            ))
            .map_err(state_error)?;

        let rows = session
            .query_versions(&self.select_sql())
            .map_err(state_error)?;
        if rows.is_empty() {
            session
                .execute(&format!("INSERT INTO {table} ({column}) VALUES ({base})"))
                .map_err(state_error)?;
            info!("initialised {table} at version {base}");
            return Ok(base);
        }

        self.current_version_on(session)
    }

    fn connect<C: Connector>(&self, connector: &C, params: &ConnectionParams) -> Result<C::Session> {
        let target = match connector.default_port() {
            Some(port) => format!("{}:{}/{}", params.host, params.port_or(port), params.database),
            None => params.database.clone(),
        };
        connector.connect(params).map_err(|e| {
            classify(e, |m| {
                Error::Connection(format!("failed to connect to {target}: {m}"))
            })
        })
    }

    fn apply_step<S: Session + ?Sized>(
        &self,
        session: &mut S,
        version: Version,
        sql: Option<&str>,
        record: Version,
    ) -> Result<()> {
        self.run_in_transaction(session, version, sql, record)
            .map_err(|e| {
                warn!("schema version {version} failed: {e}");
                classify(e, |message| Error::Execution { version, message })
            })
    }

    /// Run `sql` and record `record` as the new version, in one transaction.
    fn run_in_transaction<S: Session + ?Sized>(
        &self,
        session: &mut S,
        version: Version,
        sql: Option<&str>,
        record: Version,
    ) -> Result<()> {
        let mut tx = SessionTransaction::begin(session)?;
        if let Some(sql) = sql {
            debug!("executing step {version}: {sql}");
            tx.execute(sql)?;
        }
        tx.execute(&self.update_sql(record))?;
        tx.commit()
    }

    fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.table.column, self.table.table)
    }

    fn update_sql(&self, version: Version) -> String {
        format!(
            "UPDATE {} SET {} = {version}",
            self.table.table, self.table.column
        )
    }
}

fn check_versions(current: Version, target: Version, history: &MigrationHistory) -> Result<()> {
    if !history.contains(target) {
        return Err(Error::InvalidVersion(format!(
            "target version {target} is not in the migration history"
        )));
    }
    if !history.contains(current) {
        return Err(Error::InvalidVersion(format!(
            "database is at version {current}, which is not in the migration history"
        )));
    }
    Ok(())
}

fn down_plan(
    current: Version,
    target: Version,
    history: &MigrationHistory,
) -> Result<Vec<(&MigrationStep, Version)>> {
    check_versions(current, target, history)?;
    let plan: Vec<_> = history.pending_down(current, target).collect();
    if let Some((step, _)) = plan.iter().find(|(step, _)| !step.is_reversible()) {
        return Err(Error::Irreversible(step.version));
    }
    Ok(plan)
}

/// Turn a raw driver failure into the error for the phase it happened in.
/// Errors that are already classified pass through.
fn classify(e: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    match e {
        Error::Driver(message) => wrap(message),
        other => other,
    }
}
