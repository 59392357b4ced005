//! The compile step: an external collaborator whose job is to build the
//! system under test from source before any case runs. Internals (the
//! actual build graph) are out of scope for this harness; this module only
//! types the seam a suite's [`crate::suite::TestInitiator`] can invoke.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Result, TestError};

/// Builds the system under test. The default implementation shells out to
/// `cmake`/`make`, matching the original's `util/mycompile.py` wrapper.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        cmake_args: &[String],
        make_args: &[String],
    ) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct CmakeCompiler;

#[async_trait]
impl Compiler for CmakeCompiler {
    async fn compile(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        cmake_args: &[String],
        make_args: &[String],
    ) -> Result<()> {
        std::fs::create_dir_all(build_dir).map_err(TestError::Io)?;

        info!(?source_dir, ?build_dir, "configuring build");
        let configure = Command::new("cmake")
            .arg(source_dir)
            .args(cmake_args)
            .current_dir(build_dir)
            .output()
            .await
            .map_err(TestError::Io)?;
        if !configure.status.success() {
            warn!(status = %configure.status, "cmake configure failed");
            return Err(TestError::CompileFailed {
                message: String::from_utf8_lossy(&configure.stderr).into_owned(),
            });
        }

        info!("building");
        let build = Command::new("make")
            .args(make_args)
            .current_dir(build_dir)
            .output()
            .await
            .map_err(TestError::Io)?;
        if !build.status.success() {
            warn!(status = %build.status, "make failed");
            return Err(TestError::CompileFailed {
                message: String::from_utf8_lossy(&build.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
