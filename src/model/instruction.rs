//! The instruction model (C4): a closed set of instruction kinds, each
//! carrying its own request, expectation, and timing contract.

use std::time::Duration;

use super::request::{CommandKind, Request};
use super::response::{Response, ResponseMessage};

/// Default per-instruction timeout, matching the original's soft timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a `RuntimeSql` instruction's oracle-derived expectation looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSqlResultType {
    /// Expect a single `SUCCESS`/`FAILURE` line.
    Boolean,
    /// Expect a rendered result set, shaped by the oracle adaptor.
    ResultSet,
}

/// One of the recognized `ensure:` structural predicates over an `EXPLAIN` plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsurePredicate {
    HashJoin,
    HashJoinTimes2,
    HashJoinTimes4,
    NestedLoopJoin,
    NestedLoopJoinTimes2,
}

impl EnsurePredicate {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ensure:hashjoin" => Some(Self::HashJoin),
            "ensure:hashjoin*2" => Some(Self::HashJoinTimes2),
            "ensure:hashjoin*4" => Some(Self::HashJoinTimes4),
            "ensure:nlj" => Some(Self::NestedLoopJoin),
            "ensure:nlj*2" => Some(Self::NestedLoopJoinTimes2),
            _ => None,
        }
    }

    /// The plan-text operator token this predicate counts occurrences of.
    pub fn operator_token(&self) -> &'static str {
        match self {
            Self::HashJoin | Self::HashJoinTimes2 | Self::HashJoinTimes4 => "HASH_JOIN",
            Self::NestedLoopJoin | Self::NestedLoopJoinTimes2 => "NESTED_LOOP_JOIN",
        }
    }

    /// The exact occurrence count the predicate requires.
    pub fn expected_count(&self) -> usize {
        match self {
            Self::HashJoin | Self::NestedLoopJoin => 1,
            Self::HashJoinTimes2 | Self::NestedLoopJoinTimes2 => 2,
            Self::HashJoinTimes4 => 4,
        }
    }
}

/// A benchmark kind run by an `Executable` instruction.
#[derive(Debug, Clone)]
pub enum ExecutableKind {
    /// A plain pass/fail unit test binary.
    Unittest,
    /// An approximate-nearest-neighbor benchmark; output is parsed for
    /// recall and queries-per-second, each checked against a threshold.
    AnnBenchmark { min_recall: f64, min_qps: f64 },
    /// A TPC-C style benchmark; output is parsed for transactions-per-second.
    Tpcc { min_tpmc: f64 },
}

/// The full instruction model: a closed set of variants, one per kind the
/// harness understands. Dispatch is a `match` in the executor layer rather
/// than runtime type identity — the variant set is finite and stable.
#[derive(Debug, Clone)]
pub enum Instruction {
    Echo {
        payload: String,
    },
    Sql {
        sql: String,
        expected: Response,
        timeout: Duration,
    },
    RuntimeSql {
        sql: String,
        /// Alternate payload to send to the oracle, when its dialect differs.
        oracle_sql: Option<String>,
        result_type: RuntimeSqlResultType,
        remove_header: bool,
        timeout: Duration,
    },
    EnsureSql {
        sql: String,
        predicate: EnsurePredicate,
        timeout: Duration,
    },
    /// Decorator: wraps another instruction, sorting both expected and
    /// received `Normal` messages after execution.
    Sort {
        inner: Box<Instruction>,
    },
    Connect {
        name: String,
    },
    Connection {
        name: String,
    },
    Restart {
        force: bool,
    },
    Executable {
        path: String,
        args: Vec<String>,
        kind: ExecutableKind,
        timeout: Duration,
    },
    /// Legacy text-mode instruction: a blob of `mysqltest`-style lines,
    /// re-dispatched line by line, compared against the sibling `.result`
    /// file's lines. Kept for the legacy text loader.
    Chunk {
        lines: Vec<String>,
        expected: Response,
    },
    /// A dynamically resolved instruction: the static expectation a
    /// `RuntimeSql` or `Sort` execution computed at run time, reported in
    /// place of the instruction that originally produced it. Never
    /// constructed by case-author code directly.
    Resolved {
        request: Request,
        expected: Response,
        timeout: Duration,
    },
}

impl Instruction {
    pub fn sql(sql: impl Into<String>, expected: Response) -> Self {
        Self::Sql {
            sql: sql.into(),
            expected,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn sorted(self) -> Self {
        Self::Sort {
            inner: Box::new(self),
        }
    }

    /// The request this instruction sends. `Sort` delegates to its inner
    /// instruction's request since the decorator only affects post-processing.
    pub fn request(&self) -> Request {
        match self {
            Self::Echo { payload } => Request::new(CommandKind::Echo, payload.clone()),
            Self::Sql { sql, .. } => Request::new(CommandKind::Sql, sql.clone()),
            Self::RuntimeSql { sql, .. } => Request::new(CommandKind::RuntimeSql, sql.clone()),
            Self::EnsureSql { sql, .. } => {
                Request::new(CommandKind::Sql, format!("EXPLAIN {sql}"))
            }
            Self::Sort { inner } => inner.request(),
            Self::Connect { name } => Request::new(CommandKind::Connect, name.clone()),
            Self::Connection { name } => Request::new(CommandKind::Connection, name.clone()),
            Self::Restart { .. } => Request::new(CommandKind::Restart, String::new()),
            Self::Executable { path, .. } => Request::new(CommandKind::Executable, path.clone()),
            Self::Chunk { lines, .. } => Request::new(CommandKind::Chunk, lines.join("\n")),
            Self::Resolved { request, .. } => request.clone(),
        }
    }

    /// Build a resolved instruction from an oracle-derived (or sort-derived)
    /// expectation, carrying the original request forward for display.
    pub fn resolved(request: Request, expected_lines: Vec<String>, timeout: Duration) -> Self {
        Self::Resolved {
            request,
            expected: Response::new(
                expected_lines
                    .into_iter()
                    .map(ResponseMessage::Normal)
                    .collect(),
            ),
            timeout,
        }
    }

    /// The statically known expected response, if any. `RuntimeSql`'s
    /// expectation is resolved dynamically by the executor and is not
    /// available here; callers needing it use the rewritten `Instruction`
    /// the executor returns (see `crate::executor::runtime_sql`).
    pub fn static_expected(&self) -> Option<&Response> {
        match self {
            Self::Sql { expected, .. } => Some(expected),
            Self::Sort { inner } => inner.static_expected(),
            Self::Chunk { expected, .. } => Some(expected),
            Self::Resolved { expected, .. } => Some(expected),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Self::Sql { timeout, .. }
            | Self::RuntimeSql { timeout, .. }
            | Self::EnsureSql { timeout, .. }
            | Self::Executable { timeout, .. }
            | Self::Resolved { timeout, .. } => *timeout,
            Self::Sort { inner } => inner.timeout(),
            _ => DEFAULT_TIMEOUT,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Echo { .. } => "echo",
            Self::Sql { .. } => "sql",
            Self::RuntimeSql { .. } => "runtime_sql",
            Self::EnsureSql { .. } => "ensure_sql",
            Self::Sort { .. } => "sort",
            Self::Connect { .. } => "connect",
            Self::Connection { .. } => "connection",
            Self::Restart { .. } => "restart",
            Self::Executable { .. } => "executable",
            Self::Chunk { .. } => "chunk",
            Self::Resolved { .. } => "resolved",
        }
    }
}
