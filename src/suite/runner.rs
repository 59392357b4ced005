//! The suite runner proper (C7): drives the case executor over an ordered
//! list of cases, one at a time, and aggregates their verdicts.

use std::time::Instant;

use tracing::info;

use crate::case;
use crate::config::HarnessConfig;
use crate::model::TestCase;
use crate::oracle::MysqlOracleConnector;

use super::{TestInitiator, TestResult};

/// Owns the harness configuration and (if configured) a reference-engine
/// connector, and runs cases against them one at a time — never two cases
/// concurrently, since no two cases may share a server or data directory.
pub struct SuiteRunner {
    config: HarnessConfig,
    oracle_connector: Option<MysqlOracleConnector>,
}

impl SuiteRunner {
    pub fn new(config: HarnessConfig) -> Self {
        let oracle_connector = config.oracle.as_ref().map(MysqlOracleConnector::new);
        Self {
            config,
            oracle_connector,
        }
    }

    /// Run every case in `cases`, in the order given, against a live
    /// system under test.
    pub async fn run(&self, suite_name: &str, cases: &[TestCase]) -> TestResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            info!(case = %case.name, "running case");
            let result = case::execute(case, &self.config, self.oracle_connector.as_ref()).await;
            if !result.passed() {
                info!(case = %case.name, "case failed");
            }
            results.push(result);
        }
        TestResult::new(suite_name, results, start.elapsed())
    }

    /// Run only the named subset, preserving `cases`' relative order.
    pub async fn run_selected(&self, suite_name: &str, cases: &[TestCase], names: &[String]) -> TestResult {
        let selected: Vec<TestCase> = cases
            .iter()
            .filter(|c| names.iter().any(|n| n == &c.name))
            .cloned()
            .collect();
        self.run(suite_name, &selected).await
    }

    /// Run every case's `dryrun` path: validates the instruction tree
    /// against a mocked client/supervisor without touching a real server or
    /// oracle.
    pub async fn dryrun_all(&self, suite_name: &str, cases: &[TestCase]) -> TestResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(case::dryrun(case).await);
        }
        TestResult::new(suite_name, results, start.elapsed())
    }

    pub async fn run_initiator(&self, initiator: &dyn TestInitiator) -> crate::error::Result<()> {
        initiator.init(&self.config).await
    }
}
