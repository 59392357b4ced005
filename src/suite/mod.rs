//! The suite runner (C7) and suite loader (C10): discover [`TestCase`]
//! values from a directory, then iterate and aggregate per-case verdicts.

mod loader;
mod result;
mod runner;

pub use loader::{load_script_cases, load_text_cases, CaseFactory};
pub use result::TestResult;
pub use runner::SuiteRunner;

use async_trait::async_trait;

use crate::config::HarnessConfig;
use crate::error::Result;

/// Runs once, before the first case in a suite executes. The default
/// implementation is a no-op; a suite may supply one that invokes the
/// external compile step (see [`crate::compile::Compiler`]) ahead of time.
#[async_trait]
pub trait TestInitiator: Send + Sync {
    async fn init(&self, config: &HarnessConfig) -> Result<()>;
}

/// The no-op initiator used when a suite needs no setup beyond loading its
/// cases.
#[derive(Debug, Default)]
pub struct NoopInitiator;

#[async_trait]
impl TestInitiator for NoopInitiator {
    async fn init(&self, _config: &HarnessConfig) -> Result<()> {
        Ok(())
    }
}
