//! Error types for the test harness.
//!
//! The harness distinguishes two disjoint failure categories at the type
//! level: [`TestError`] for bugs and environment faults in the harness
//! itself, and [`TestUserError`] for failures attributable to the system
//! under test. A third category, instruction comparison mismatch, is not an
//! error at all — it is a plain `false` return from [`crate::case::CheckResult`].

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness-internal operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Result type alias for operations that may fail due to the system under test.
pub type UserResult<T> = std::result::Result<T, TestUserError>;

/// Harness-side faults: configuration, environment, or internal bugs.
///
/// None of these are ever the system under test's fault; a case that fails
/// with a `TestError` is reported as a harness defect, not a SUT regression.
#[derive(Error, Debug)]
pub enum TestError {
    /// I/O error outside of the wire protocol (file system, process spawn).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be parsed or was missing required fields.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A test case referenced an associate group that does not exist or
    /// appears later in the same suite.
    #[error("invalid associate group reference in case '{case}': {detail}")]
    InvalidAssociateGroup { case: String, detail: String },

    /// Two test cases in the same suite share a name.
    #[error("duplicate test case name: {name}")]
    DuplicateCaseName { name: String },

    /// An instruction reached an executor that does not know its variant.
    #[error("no executor registered for instruction variant {variant}")]
    UnknownInstruction { variant: &'static str },

    /// The case-level watchdog fired before the group loop completed.
    #[error("case '{case}' exceeded its {limit:?} watchdog")]
    CaseWatchdog { case: String, limit: Duration },

    /// The compile step failed.
    #[error("compile failed: {message}")]
    CompileFailed { message: String },

    /// The source fetch step failed.
    #[error("source fetch failed: {message}")]
    FetchFailed { message: String },
}

/// Failures attributable to the system under test (or its surrounding
/// environment, e.g. a crash, a refused connection, a timed-out probe).
///
/// Caught by the case executor and folded into a [`crate::case::TestCaseResult::user_exception`].
#[derive(Error, Debug)]
pub enum TestUserError {
    /// The wire client could not read a complete response before its deadline.
    #[error("timed out waiting for a response after {0:?}")]
    Timeout(Duration),

    /// The peer closed the connection mid-response.
    #[error("connection closed while waiting for a response")]
    ConnectionClosed,

    /// I/O error talking to the system under test.
    #[error("I/O error talking to server: {0}")]
    Io(#[from] io::Error),

    /// The server process failed to become ready within its start deadline.
    #[error("server did not become ready within {0:?}")]
    ServerNotReady(Duration),

    /// The server process exited (crashed) while the case was running.
    #[error("server exited unexpectedly: {status}")]
    ServerCrashed { status: String },

    /// The server failed to come back up after a restart instruction.
    #[error("server failed to restart")]
    RestartFailed,

    /// An `ensure:` predicate over an EXPLAIN plan was not satisfied.
    #[error("failed to ensure sql: expected {predicate} on plan, found {actual} occurrences")]
    EnsureSqlFailed {
        predicate: String,
        actual: usize,
    },

    /// An external executable instruction exited with a non-zero status.
    #[error("executable '{path}' exited with status {status}: {output}")]
    ExecutableFailed {
        path: String,
        status: String,
        output: String,
    },

    /// An external executable instruction did not finish before its timeout.
    #[error("executable '{path}' timed out after {timeout:?}")]
    ExecutableTimeout { path: String, timeout: Duration },

    /// A benchmark's parsed metric did not meet the configured threshold.
    #[error("benchmark metric below threshold: {metric} = {actual}, required >= {required}")]
    BenchmarkThreshold {
        metric: String,
        actual: f64,
        required: f64,
    },

    /// The named client connection does not exist.
    #[error("no such connection: {name}")]
    UnknownConnection { name: String },

    /// The oracle (reference engine) connection failed.
    #[error("oracle connection error: {message}")]
    Oracle { message: String },
}

impl TestUserError {
    /// Truncate the user-visible message the way failure reports do: at
    /// most 4 KiB, matching the budget used for embedding `user_exception`
    /// text into a [`crate::case::TestCaseResult`].
    pub fn truncated_message(&self) -> String {
        let full = self.to_string();
        const LIMIT: usize = 4096;
        if full.len() <= LIMIT {
            full
        } else {
            let mut truncated = full[..LIMIT].to_string();
            truncated.push_str(" ... (truncated)");
            truncated
        }
    }
}
