//! The instruction executors (C5): one pure function per instruction
//! variant, dispatched from a `match` over the closed [`Instruction`] enum
//! rather than runtime type identity — the variant set is finite and
//! stable, so open-ended reflection would buy nothing here.

mod context;

pub use context::ExecuteContext;

use std::time::Duration;

use futures::future::BoxFuture;
use regex::Regex;

use crate::case::result::InstructionResult;
use crate::error::TestUserError;
use crate::model::{
    EnsurePredicate, ExecutableKind, Instruction, Request, Response, ResponseMessage,
    RuntimeSqlResultType,
};
use crate::oracle::{OracleAdaptor, OracleOutcome};

/// Split raw response text into `Debug`/`Normal` lines the way every SQL
/// executor does: a line beginning with `#` (after trimming) is diagnostic.
fn classify_lines(text: &str) -> Response {
    let messages = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            if line.starts_with('#') {
                ResponseMessage::Debug(line.to_string())
            } else {
                ResponseMessage::Normal(line.to_string())
            }
        })
        .collect();
    Response::new(messages)
}

/// Dispatch one instruction against the live case context, returning its
/// result. A `TestUserError` here is the SUT/environment's fault and is
/// caught by the case executor's group loop, not retried.
pub fn execute<'a>(
    instruction: &'a Instruction,
    ctx: &'a mut dyn ExecuteContext,
) -> BoxFuture<'a, Result<InstructionResult, TestUserError>> {
    Box::pin(async move {
        match instruction {
            Instruction::Echo { payload } => Ok(echo(instruction, payload)),
            Instruction::Sql { sql, timeout, .. } => sql_exec(instruction, ctx, sql, *timeout).await,
            Instruction::RuntimeSql {
                sql,
                oracle_sql,
                result_type,
                remove_header,
                timeout,
            } => {
                runtime_sql(
                    ctx,
                    sql,
                    oracle_sql.as_deref(),
                    *result_type,
                    *remove_header,
                    *timeout,
                )
                .await
            }
            Instruction::EnsureSql {
                sql,
                predicate,
                timeout,
            } => ensure_sql(instruction, ctx, sql, *predicate, *timeout).await,
            Instruction::Sort { inner } => sort(inner, ctx).await,
            Instruction::Connect { name } => connect(instruction, ctx, name).await,
            Instruction::Connection { name } => connection(instruction, ctx, name).await,
            Instruction::Restart { force } => restart(instruction, ctx, *force).await,
            Instruction::Executable {
                path,
                args,
                kind,
                timeout,
            } => executable(instruction, ctx, path, args, kind, *timeout).await,
            Instruction::Chunk { lines, .. } => chunk(instruction, ctx, lines).await,
            Instruction::Resolved { .. } => {
                // Only ever produced by `runtime_sql`/`sort` below; never
                // dispatched directly by a case author.
                Ok(InstructionResult::new(instruction.clone(), Response::empty()))
            }
        }
    })
}

fn echo(instruction: &Instruction, payload: &str) -> InstructionResult {
    InstructionResult::new(
        instruction.clone(),
        Response::new(vec![ResponseMessage::Normal(payload.to_string())]),
    )
}

async fn sql_exec(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    sql: &str,
    timeout: Duration,
) -> Result<InstructionResult, TestUserError> {
    let text = ctx.run_sql(sql, timeout).await?;
    Ok(InstructionResult::new(instruction.clone(), classify_lines(&text)))
}

async fn ensure_sql(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    sql: &str,
    predicate: EnsurePredicate,
    timeout: Duration,
) -> Result<InstructionResult, TestUserError> {
    let plan = ctx.run_sql(&format!("EXPLAIN {sql}"), timeout).await?;
    let actual = plan.matches(predicate.operator_token()).count();
    if actual != predicate.expected_count() {
        return Err(TestUserError::EnsureSqlFailed {
            predicate: format!("{predicate:?}"),
            actual,
        });
    }
    Ok(InstructionResult::new(instruction.clone(), Response::empty()))
}

/// The most intricate executor: runs the SUT's payload, then the oracle's,
/// and rewrites the instruction in place so the case is reported against
/// the resolved (oracle-derived) expectation rather than the dynamic
/// placeholder that was dispatched.
async fn runtime_sql(
    ctx: &mut dyn ExecuteContext,
    sql: &str,
    oracle_sql: Option<&str>,
    result_type: RuntimeSqlResultType,
    remove_header: bool,
    timeout: Duration,
) -> Result<InstructionResult, TestUserError> {
    let text = ctx.run_sql(sql, timeout).await?;
    let response = classify_lines(&text);

    let mut normal_lines: Vec<String> = response
        .normal_messages()
        .map(|m| m.text().to_string())
        .collect();
    let debug_lines: Vec<String> = response
        .debug_messages()
        .map(|m| m.text().to_string())
        .collect();

    let is_single_failure =
        normal_lines.len() == 1 && normal_lines[0].eq_ignore_ascii_case("FAILURE");
    if remove_header && result_type == RuntimeSqlResultType::ResultSet && !is_single_failure && !normal_lines.is_empty()
    {
        normal_lines.remove(0);
    }

    let mut received = Response::new(debug_lines.into_iter().map(ResponseMessage::Debug).collect());
    for line in normal_lines {
        received.push(ResponseMessage::Normal(line));
    }

    let oracle_payload = oracle_sql.unwrap_or(sql);
    let outcome = ctx.run_oracle(oracle_payload).await?;

    let expected_lines = match (result_type, outcome) {
        (RuntimeSqlResultType::Boolean, OracleOutcome::SqlError(_)) => vec!["FAILURE".to_string()],
        (RuntimeSqlResultType::Boolean, OracleOutcome::Success(_)) => vec!["SUCCESS".to_string()],
        (RuntimeSqlResultType::ResultSet, OracleOutcome::SqlError(_)) => vec!["FAILURE".to_string()],
        (RuntimeSqlResultType::ResultSet, OracleOutcome::Success(result)) => {
            OracleAdaptor::render_lines(&result, !remove_header)
        }
    };

    let resolved = Instruction::resolved(Request::new(crate::model::CommandKind::Sql, sql.to_string()), expected_lines, timeout);
    Ok(InstructionResult::new(resolved, received))
}

async fn sort(
    inner: &Instruction,
    ctx: &mut dyn ExecuteContext,
) -> Result<InstructionResult, TestUserError> {
    let inner_result = execute(inner, ctx).await?;
    let sorted_received = inner_result.received.sorted();
    let sorted_expected = inner_result
        .instruction
        .static_expected()
        .cloned()
        .unwrap_or_default()
        .sorted();

    let resolved = Instruction::Resolved {
        request: inner_result.instruction.request(),
        expected: sorted_expected,
        timeout: inner_result.instruction.timeout(),
    };
    Ok(InstructionResult::new(resolved, sorted_received))
}

async fn connect(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    name: &str,
) -> Result<InstructionResult, TestUserError> {
    ctx.connect(name).await?;
    Ok(InstructionResult::new(instruction.clone(), Response::empty()))
}

async fn connection(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    name: &str,
) -> Result<InstructionResult, TestUserError> {
    ctx.switch_connection(name).await?;
    // Give the newly current connection's session a moment to settle,
    // matching the original client's fixed post-switch pause.
    tokio::time::sleep(Duration::from_secs(2)).await;
    Ok(InstructionResult::new(instruction.clone(), Response::empty()))
}

async fn restart(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    force: bool,
) -> Result<InstructionResult, TestUserError> {
    ctx.restart(force).await?;
    Ok(InstructionResult::new(instruction.clone(), Response::empty()))
}

async fn executable(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    path: &str,
    args: &[String],
    kind: &ExecutableKind,
    timeout: Duration,
) -> Result<InstructionResult, TestUserError> {
    let output = ctx.run_executable(path, args, timeout).await?;
    let response = Response::new(
        output
            .lines()
            .map(|l| ResponseMessage::Debug(l.trim().to_string()))
            .collect(),
    );

    let score = match kind {
        ExecutableKind::Unittest => None,
        ExecutableKind::AnnBenchmark { min_recall, min_qps } => {
            Some(check_ann_benchmark(&output, *min_recall, *min_qps)?)
        }
        ExecutableKind::Tpcc { min_tpmc } => Some(check_tpcc(&output, *min_tpmc)?),
    };

    let mut result = InstructionResult::new(instruction.clone(), response);
    if let Some(score) = score {
        result = result.with_score(score);
    }
    Ok(result)
}

/// Parses a line like `0: MiniOBVector() 0.965 178.338` (recall, qps) and
/// checks both against their acceptance thresholds.
fn check_ann_benchmark(output: &str, min_recall: f64, min_qps: f64) -> Result<f64, TestUserError> {
    let re = Regex::new(r"(?m)^\s*\d+:\s+\S+\(\)\s+(\d+\.\d+)\s+(\d+\.\d+)").expect("valid regex");
    let caps = re
        .captures(output)
        .ok_or_else(|| TestUserError::Oracle {
            message: "ann benchmark output did not contain a recall/qps line".to_string(),
        })?;
    let recall: f64 = caps[1].parse().unwrap_or(0.0);
    let qps: f64 = caps[2].parse().unwrap_or(0.0);

    if recall < min_recall {
        return Err(TestUserError::BenchmarkThreshold {
            metric: "recall".to_string(),
            actual: recall,
            required: min_recall,
        });
    }
    if qps < min_qps {
        return Err(TestUserError::BenchmarkThreshold {
            metric: "qps".to_string(),
            actual: qps,
            required: min_qps,
        });
    }
    Ok(qps)
}

/// Parses a trailing transactions-per-minute metric out of a TPC-C run's
/// output and checks it against the acceptance threshold.
fn check_tpcc(output: &str, min_tpmc: f64) -> Result<f64, TestUserError> {
    let re = Regex::new(r"(?i)tpmC\s*[:=]\s*(\d+(?:\.\d+)?)").expect("valid regex");
    let tpmc: f64 = re
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| TestUserError::Oracle {
            message: "tpcc output did not contain a tpmC metric".to_string(),
        })?;
    if tpmc < min_tpmc {
        return Err(TestUserError::BenchmarkThreshold {
            metric: "tpmC".to_string(),
            actual: tpmc,
            required: min_tpmc,
        });
    }
    Ok(tpmc)
}

/// Legacy text-mode dispatch: re-parses each line of the chunk as its own
/// `mysqltest`-style command (`--echo`, `--sort`, `--connect`, ...) or, for
/// a bare line, a plain SQL statement, and concatenates the sub-results.
/// Kept for the text loader; not used by script-authored cases.
async fn chunk(
    instruction: &Instruction,
    ctx: &mut dyn ExecuteContext,
    lines: &[String],
) -> Result<InstructionResult, TestUserError> {
    let mut received = Response::empty();
    for raw_line in lines {
        let line = raw_line.trim();
        if line.is_empty() {
            received.push(ResponseMessage::Normal(String::new()));
            continue;
        }

        let sub = match parse_chunk_line(line) {
            Some(sub) => sub,
            None => continue,
        };
        let sub_result = execute(&sub, ctx).await?;
        for message in sub_result.received.into_messages() {
            received.push(message);
        }
    }
    Ok(InstructionResult::new(instruction.clone(), received))
}

fn parse_chunk_line(line: &str) -> Option<Instruction> {
    if let Some(rest) = line.strip_prefix('#') {
        return Some(Instruction::Echo {
            payload: rest.trim().to_string(),
        });
    }
    if let Some(rest) = line.strip_prefix("--") {
        let rest = rest.trim();
        let mut parts = rest.splitn(2, ' ');
        let command = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().unwrap_or_default().to_string();
        return match command.as_str() {
            "echo" => Some(Instruction::Echo { payload: arg }),
            "sort" => Some(Instruction::sql(arg, Response::empty()).sorted()),
            "connect" => Some(Instruction::Connect { name: arg }),
            "connection" => Some(Instruction::Connection { name: arg }),
            "restart" => Some(Instruction::Restart { force: false }),
            _ => None,
        };
    }
    Some(Instruction::sql(line.to_string(), Response::empty()))
}
