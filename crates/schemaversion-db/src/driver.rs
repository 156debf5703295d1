use schemaversion_common::{Result, Version};
use schemaversion_config::ConnectionParams;
use tracing::warn;

/// An open database session. Driver failures are reported as
/// [`schemaversion_common::Error::Driver`]; callers decide what they mean.
pub trait Session {
    /// Execute one or more statements, discarding any rows.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run a query and return its first column as integer versions, one entry
    /// per row. NULLs come back as `None`.
    fn query_versions(&mut self, sql: &str) -> Result<Vec<Option<Version>>>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Opens sessions for a particular database engine.
pub trait Connector {
    type Session: Session;

    /// The engine's standard port, used when the params leave it unset.
    /// `None` for embedded engines.
    fn default_port(&self) -> Option<u16>;

    fn connect(&self, params: &ConnectionParams) -> Result<Self::Session>;
}

/// A transaction scoped to a borrow of the session. Rolls back on drop unless
/// [`commit`](Self::commit) succeeded.
pub struct SessionTransaction<'a, S: Session + ?Sized> {
    session: &'a mut S,
    finished: bool,
}

impl<'a, S: Session + ?Sized> SessionTransaction<'a, S> {
    pub fn begin(session: &'a mut S) -> Result<Self> {
        session.begin()?;
        Ok(Self {
            session,
            finished: false,
        })
    }

    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.session.execute(sql)
    }

    pub fn commit(mut self) -> Result<()> {
        self.session.commit()?;
        self.finished = true;
        Ok(())
    }
}

impl<S: Session + ?Sized> Drop for SessionTransaction<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.session.rollback() {
                warn!("rollback failed: {e}");
            }
        }
    }
}
