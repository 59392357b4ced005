//! The case executor (C6): the per-case state machine that owns one
//! [`Supervisor`], a named map of [`WireClient`]s, and optionally one
//! [`OracleAdaptor`], and drives a [`TestCase`] through
//! `init → run groups → diagnose → teardown`.

pub mod result;

pub use result::{InstructionResult, InstructionResultGroup, TestCaseResult};

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, info_span, warn, Instrument};

use crate::config::{HarnessConfig, ServerConfig};
use crate::error::TestUserError;
use crate::executor::{self, ExecuteContext};
use crate::model::{Response, ResponseMessage, ServerOptions, TestCase};
use crate::oracle::{MysqlOracleConnector, OracleAdaptor, OracleOutcome};
use crate::supervisor::{Endpoint, Supervisor};
use crate::wire::{WireClient, WireTransport};

const DEFAULT_CONNECTION: &str = "default";

/// Runs one [`TestCase`] to completion and returns its verdict.
///
/// `oracle_connector` is `None` when the harness was started without a
/// reference-engine configuration; a case with `need_mysql = true` then
/// fails fast with a `test_exception` rather than attempting a connection.
pub async fn execute(
    case: &TestCase,
    config: &HarnessConfig,
    oracle_connector: Option<&MysqlOracleConnector>,
) -> TestCaseResult {
    let span = info_span!("test_case", name = %case.name);
    run(case, config, oracle_connector).instrument(span).await
}

async fn run(
    case: &TestCase,
    config: &HarnessConfig,
    oracle_connector: Option<&MysqlOracleConnector>,
) -> TestCaseResult {
    let mut result = TestCaseResult::new(case);

    if let Err(e) = case.validate() {
        result.test_exception = Some(e.to_string());
        return result;
    }

    let mut ctx = CaseContext::new(config.server.clone(), case.server_options.clone());

    if case.need_observer {
        if let Err(e) = ctx.supervisor.start(&ctx.server_options).await {
            result.user_exception = Some(e.truncated_message());
            result.core_backtrace = ctx.supervisor.last_backtrace().map(str::to_string);
            teardown(&mut ctx).await;
            return result;
        }
        if let Err(e) = ctx.connect(DEFAULT_CONNECTION).await {
            result.user_exception = Some(e.truncated_message());
            teardown(&mut ctx).await;
            return result;
        }
    }

    if case.need_mysql {
        match oracle_connector {
            None => {
                result.test_exception =
                    Some(format!("case '{}' requires an oracle but none is configured", case.name));
                teardown(&mut ctx).await;
                return result;
            }
            Some(connector) => {
                if let Err(e) = ctx.init_oracle(connector).await {
                    result.user_exception = Some(e.truncated_message());
                    teardown(&mut ctx).await;
                    return result;
                }
            }
        }
    }

    match tokio::time::timeout(config.case_timeout(), run_groups(case, &mut ctx, &mut result))
        .await
    {
        Ok(()) => {}
        Err(_) => {
            result.test_exception = Some(format!(
                "case '{}' exceeded its {:?} watchdog",
                case.name,
                config.case_timeout()
            ));
        }
    }

    teardown(&mut ctx).await;
    result
}

/// The group loop proper: runs every instruction in declaration order,
/// stopping at the first `user_exception` or comparison failure.
async fn run_groups(case: &TestCase, ctx: &mut dyn ExecuteContext, result: &mut TestCaseResult) {
    'groups: for group in &case.groups {
        let mut result_group = InstructionResultGroup::new(group.name.clone());
        for instruction in &group.instructions {
            match executor::execute(instruction, ctx).await {
                Ok(mut instr_result) => {
                    if let Some(score) = instr_result.score {
                        result.score += score;
                    }
                    let passed = instr_result.mark_checked();
                    if passed {
                        instr_result.clear_response();
                    }
                    result_group.results.push(instr_result);
                    if !passed {
                        result.groups.push(result_group);
                        break 'groups;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "instruction raised a user exception");
                    result.user_exception = Some(err.truncated_message());
                    result.core_backtrace = ctx.last_backtrace().map(str::to_string);
                    let mut exception_result = InstructionResult::new(
                        instruction.clone(),
                        Response::new(vec![ResponseMessage::Normal(err.truncated_message())]),
                    );
                    exception_result.mark_failed();
                    result_group.results.push(exception_result);
                    result.groups.push(result_group);
                    break 'groups;
                }
            }
        }
        result.groups.push(result_group);
    }
}

/// Always-runs cleanup: close client connections, stop the supervised
/// process (and sweep any surviving siblings launched through a user-switch
/// shell), and clean the data directory.
async fn teardown(ctx: &mut CaseContext) {
    ctx.connections.clear();
    ctx.supervisor.stop().await.ok();
    let swept = ctx.supervisor.stop_all_matching();
    if swept > 0 {
        info!(count = swept, "swept surviving server processes");
    }
    ctx.supervisor.clean();
}

/// Owns the live resources for one case: the supervisor, the named
/// connection map, and (if the case needs it) the oracle adaptor. This is
/// the concrete [`ExecuteContext`] the instruction executors run against.
struct CaseContext {
    supervisor: Supervisor,
    server_options: ServerOptions,
    connections: HashMap<String, WireClient>,
    current: String,
    oracle: Option<OracleAdaptor>,
    oracle_connector: Option<MysqlOracleConnector>,
}

impl CaseContext {
    fn new(server_config: ServerConfig, server_options: ServerOptions) -> Self {
        Self {
            supervisor: Supervisor::new(server_config),
            server_options,
            connections: HashMap::new(),
            current: DEFAULT_CONNECTION.to_string(),
            oracle: None,
            oracle_connector: None,
        }
    }

    async fn open_transport(&self) -> Result<WireTransport, TestUserError> {
        match self.supervisor.endpoint() {
            Endpoint::Unix(path) => WireTransport::connect_unix(path).await,
            Endpoint::Tcp { host, port } => WireTransport::connect_tcp(&host, port).await,
        }
    }

    async fn init_oracle(&mut self, connector: &MysqlOracleConnector) -> Result<(), TestUserError> {
        let database = oracle_player_database();
        let mut adaptor = OracleAdaptor::new(database);
        let default_conn = connector.connect().await?;
        adaptor.init(default_conn).await?;
        self.oracle = Some(adaptor);
        self.oracle_connector = Some(connector.clone());
        Ok(())
    }
}

/// A per-player reference database name. The original derives this from the
/// invoking player/session identity; this port has no such ambient
/// identity, so it uses a fixed name scoped to the harness itself — safe
/// because exactly one case runs at a time (see §5's scheduling model) and
/// `init_oracle` drops and recreates the database on every case.
fn oracle_player_database() -> String {
    "miniob_test_harness".to_string()
}

#[async_trait::async_trait]
impl ExecuteContext for CaseContext {
    async fn run_sql(&mut self, sql: &str, timeout: Duration) -> Result<String, TestUserError> {
        let name = self.current.clone();
        let client = self
            .connections
            .get_mut(&name)
            .ok_or_else(|| TestUserError::UnknownConnection { name: name.clone() })?;
        client.run_sql(sql, timeout).await
    }

    async fn connect(&mut self, name: &str) -> Result<(), TestUserError> {
        let transport = self.open_transport().await?;
        let client = WireClient::new(name, transport);
        self.connections.insert(name.to_string(), client);

        // Keep the oracle session map in lockstep with the connection map:
        // every named wire-client connection beyond `default` gets its own
        // reference session, created through the same connector.
        if name != DEFAULT_CONNECTION {
            if let (Some(oracle), Some(connector)) = (&mut self.oracle, &self.oracle_connector) {
                let conn = connector.connect().await?;
                oracle.new_connect(name, conn).await?;
            }
        }
        Ok(())
    }

    async fn switch_connection(&mut self, name: &str) -> Result<(), TestUserError> {
        if !self.connections.contains_key(name) {
            return Err(TestUserError::UnknownConnection {
                name: name.to_string(),
            });
        }
        self.current = name.to_string();
        if let Some(oracle) = &mut self.oracle {
            oracle.set_current(name).ok();
        }
        Ok(())
    }

    async fn restart(&mut self, force: bool) -> Result<(), TestUserError> {
        if force {
            self.supervisor.force_stop().await?;
        } else {
            self.supervisor.stop().await?;
        }
        self.connections.clear();
        self.supervisor
            .start(&self.server_options)
            .await
            .map_err(|_| TestUserError::RestartFailed)?;
        self.connect(DEFAULT_CONNECTION).await?;
        self.current = DEFAULT_CONNECTION.to_string();
        Ok(())
    }

    async fn run_oracle(&mut self, sql: &str) -> Result<OracleOutcome, TestUserError> {
        let oracle = self.oracle.as_mut().ok_or_else(|| TestUserError::Oracle {
            message: "no oracle session established for this case".to_string(),
        })?;
        oracle.execute(sql).await
    }

    async fn run_executable(
        &mut self,
        path: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, TestUserError> {
        let mut child = Command::new(path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(TestUserError::Io)?;

        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.ok();
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.ok();
            buf
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(TestUserError::Io(e)),
            Err(_) => {
                child.kill().await.ok();
                child.wait().await.ok();
                return Err(TestUserError::ExecutableTimeout {
                    path: path.to_string(),
                    timeout,
                });
            }
        };

        let stdout_buf = stdout_task.await.unwrap_or_default();
        let stderr_buf = stderr_task.await.unwrap_or_default();
        let mut combined = String::from_utf8_lossy(&stdout_buf).into_owned();
        combined.push_str(&String::from_utf8_lossy(&stderr_buf));

        if status.success() {
            Ok(combined)
        } else {
            let mut output = combined;
            output.truncate(4096);
            Err(TestUserError::ExecutableFailed {
                path: path.to_string(),
                status: status.to_string(),
                output,
            })
        }
    }

    fn last_backtrace(&self) -> Option<&str> {
        self.supervisor.last_backtrace()
    }

    fn server_options(&self) -> &ServerOptions {
        &self.server_options
    }

    fn current_connection_name(&self) -> &str {
        &self.current
    }
}

/// Runs a case's instruction tree against a fully mocked client/supervisor:
/// no process is spawned, no socket is opened, and no oracle side effects
/// occur. Used to validate that a suite's cases are well-formed (every
/// associate-group reference resolves, every instruction variant has a
/// reachable executor) without requiring a live system under test.
pub async fn dryrun(case: &TestCase) -> TestCaseResult {
    let mut result = TestCaseResult::new(case);
    if let Err(e) = case.validate() {
        result.test_exception = Some(e.to_string());
        return result;
    }

    let mut ctx = MockContext::default();
    run_groups(case, &mut MockExecuteContextAdapter(&mut ctx), &mut result).await;
    result
}

/// In-memory stand-in for [`CaseContext`] used by [`dryrun`]. Every SQL
/// call succeeds with an empty response; restarts, connects, and oracle
/// calls are all no-ops so a case's *shape* can be validated without any
/// real I/O.
#[derive(Default)]
struct MockContext {
    connections: Vec<String>,
    current: String,
}

struct MockExecuteContextAdapter<'a>(&'a mut MockContext);

#[async_trait::async_trait]
impl ExecuteContext for MockExecuteContextAdapter<'_> {
    async fn run_sql(&mut self, _sql: &str, _timeout: Duration) -> Result<String, TestUserError> {
        Ok(String::new())
    }

    async fn connect(&mut self, name: &str) -> Result<(), TestUserError> {
        self.0.connections.push(name.to_string());
        Ok(())
    }

    async fn switch_connection(&mut self, name: &str) -> Result<(), TestUserError> {
        self.0.current = name.to_string();
        Ok(())
    }

    async fn restart(&mut self, _force: bool) -> Result<(), TestUserError> {
        Ok(())
    }

    async fn run_oracle(&mut self, _sql: &str) -> Result<OracleOutcome, TestUserError> {
        Ok(OracleOutcome::Success(crate::oracle::OracleResult {
            columns: Vec::new(),
            rows: Vec::new(),
        }))
    }

    async fn run_executable(
        &mut self,
        _path: &str,
        _args: &[String],
        _timeout: Duration,
    ) -> Result<String, TestUserError> {
        Ok(String::new())
    }

    fn last_backtrace(&self) -> Option<&str> {
        None
    }

    fn server_options(&self) -> &ServerOptions {
        static DEFAULT: ServerOptions = ServerOptions {
            trx_model: None,
            protocol: None,
            storage_engine: None,
        };
        &DEFAULT
    }

    fn current_connection_name(&self) -> &str {
        &self.0.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Response;

    #[tokio::test]
    async fn dryrun_passes_a_well_formed_case() {
        let mut case = TestCase::new("t");
        case.add_execution_group("g", &[]).add_echo_instruction("hello");

        let result = dryrun(&case).await;
        assert!(result.passed());
        assert_eq!(result.groups.len(), 1);
    }

    #[tokio::test]
    async fn group_loop_stops_at_the_first_failing_instruction() {
        let mut case = TestCase::new("t");
        case.add_execution_group("first", &[])
            .add_sql_instruction("SELECT 1", Response::single_normal("never matches a mocked empty reply"))
            .add_echo_instruction("never reached");
        case.add_execution_group("second", &[]);

        let result = dryrun(&case).await;
        assert!(!result.passed());
        assert_eq!(result.groups.len(), 1, "the second group must not run after the first fails");
        assert_eq!(result.groups[0].results.len(), 1, "the echo after the failing sql must not run");
    }

    #[tokio::test]
    async fn dryrun_surfaces_an_invalid_case_as_a_test_exception() {
        let mut case = TestCase::new("bad");
        case.groups.push(crate::model::InstructionGroup {
            name: "g".to_string(),
            instructions: Vec::new(),
            associate_groups: vec![9],
        });

        let result = dryrun(&case).await;
        assert!(result.test_exception.is_some());
        assert!(result.groups.is_empty());
    }
}
