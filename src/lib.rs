//! An end-to-end integration test harness for a networked, process-based
//! database server: it spawns the server under test, drives it over its own
//! wire protocol, optionally cross-checks results against a reference engine,
//! and reports pass/fail per case.
//!
//! The modules mirror the pipeline a suite run walks through:
//! [`wire`] talks to the server, [`supervisor`] owns its process lifecycle,
//! [`oracle`] talks to the reference engine, [`model`] describes a case as
//! data, [`executor`] knows how to run one instruction, [`case`] drives a
//! whole case through its groups, and [`suite`] drives a whole suite through
//! its cases.

pub mod case;
pub mod cases;
pub mod cli;
pub mod compile;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod model;
pub mod oracle;
pub mod report;
pub mod supervisor;
pub mod suite;
pub mod wire;

pub use case::{TestCaseResult, execute as execute_case};
pub use config::HarnessConfig;
pub use error::{Result, TestError, TestUserError, UserResult};
pub use model::{Instruction, InstructionGroup, ServerOptions, TestCase};
pub use suite::{SuiteRunner, TestResult};
