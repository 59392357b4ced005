//! The seam between instruction executors and the case executor that owns
//! the live resources (server process, client connections, oracle).

use std::time::Duration;

use crate::error::TestUserError;
use crate::model::ServerOptions;
use crate::oracle::OracleOutcome;

/// Everything an [`super::InstructionExecutor`] needs from its surrounding
/// case, abstracted behind a trait so executors stay pure functions over
/// `(&Instruction, &mut dyn ExecuteContext)` rather than reaching into a
/// concrete `CaseExecutor`.
#[async_trait::async_trait]
pub trait ExecuteContext: Send {
    /// Send `sql` over the currently selected client connection.
    async fn run_sql(&mut self, sql: &str, timeout: Duration) -> Result<String, TestUserError>;

    /// Create a new named client connection against the running server.
    async fn connect(&mut self, name: &str) -> Result<(), TestUserError>;

    /// Switch the current connection to a previously created one.
    async fn switch_connection(&mut self, name: &str) -> Result<(), TestUserError>;

    /// Stop and restart the supervised server, then reconnect the default client.
    async fn restart(&mut self, force: bool) -> Result<(), TestUserError>;

    /// Run `sql` against the oracle (reference engine) and return its
    /// shaped result.
    async fn run_oracle(&mut self, sql: &str) -> Result<OracleOutcome, TestUserError>;

    /// Run an external executable with a timeout; returns its captured
    /// stdout+stderr on success (exit code 0).
    async fn run_executable(
        &mut self,
        path: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, TestUserError>;

    /// Most recent crash backtrace, if any, for inclusion in error reports.
    fn last_backtrace(&self) -> Option<&str>;

    /// Current default server options, used when restarting.
    fn server_options(&self) -> &ServerOptions;

    fn current_connection_name(&self) -> &str;
}
