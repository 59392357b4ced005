//! The oracle adaptor (C3): runs reference SQL against a companion engine
//! and shapes its results into the system under test's textual form.

mod cell;
mod mysql;

pub use cell::{render_row, OracleCell};
pub use mysql::{MysqlOracleConnection, MysqlOracleConnector};

use async_trait::async_trait;
use tracing::debug;

use crate::error::TestUserError;

/// A query result from the reference engine: column names plus row data.
#[derive(Debug, Clone)]
pub struct OracleResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<OracleCell>>,
}

/// The outcome of running a statement against the reference engine.
///
/// A SQL-level error (bad syntax, constraint violation) is NOT a harness
/// fault — `RuntimeSqlExecutor` folds it into an expected `FAILURE` line,
/// exactly as a successful query folds into rendered rows. Only a
/// connection-level problem reaching the reference engine at all surfaces
/// as a [`TestUserError`].
#[derive(Debug, Clone)]
pub enum OracleOutcome {
    Success(OracleResult),
    SqlError(String),
}

/// The reference engine's connection surface, kept narrow and trait-based
/// so the adaptor is testable without a live MySQL-compatible server.
/// Modeled after the shape of a driver's `query` call (column/row access),
/// not its wire protocol — the adaptor never speaks the reference engine's
/// wire format directly.
#[async_trait]
pub trait OracleConnection: Send {
    async fn execute(&mut self, sql: &str) -> Result<OracleOutcome, TestUserError>;
    async fn use_database(&mut self, name: &str) -> Result<(), TestUserError>;
    async fn recreate_database(&mut self, name: &str) -> Result<(), TestUserError>;
}

/// Drives one or more reference-engine sessions, kept in lockstep with the
/// system under test's named client connections.
pub struct OracleAdaptor {
    database: String,
    sessions: Vec<(String, Box<dyn OracleConnection>)>,
    current: usize,
}

impl OracleAdaptor {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            sessions: Vec::new(),
            current: 0,
        }
    }

    /// Establish the default session: drop-and-recreate the per-player
    /// database, then select it.
    pub async fn init(&mut self, mut default: Box<dyn OracleConnection>) -> Result<(), TestUserError> {
        default.recreate_database(&self.database).await?;
        default.use_database(&self.database).await?;
        self.sessions.push(("default".to_string(), default));
        self.current = 0;
        Ok(())
    }

    pub async fn new_connect(
        &mut self,
        name: impl Into<String>,
        mut connection: Box<dyn OracleConnection>,
    ) -> Result<(), TestUserError> {
        connection.use_database(&self.database).await?;
        self.sessions.push((name.into(), connection));
        Ok(())
    }

    pub fn set_current(&mut self, name: &str) -> Result<(), TestUserError> {
        let idx = self
            .sessions
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| TestUserError::UnknownConnection {
                name: name.to_string(),
            })?;
        self.current = idx;
        Ok(())
    }

    pub async fn execute(&mut self, sql: &str) -> Result<OracleOutcome, TestUserError> {
        debug!(%sql, "executing oracle query");
        let (_, conn) = self
            .sessions
            .get_mut(self.current)
            .ok_or_else(|| TestUserError::Oracle {
                message: "no active oracle session".to_string(),
            })?;
        conn.execute(sql).await
    }

    /// Render an `OracleResult` to the lines a `RuntimeSql` expectation is
    /// built from, optionally dropping the header row.
    pub fn render_lines(result: &OracleResult, include_header: bool) -> Vec<String> {
        let mut lines = Vec::with_capacity(result.rows.len() + 1);
        if include_header {
            lines.push(result.columns.join(" | "));
        }
        for row in &result.rows {
            lines.push(render_row(row));
        }
        lines
    }
}
