//! The source-fetch step: an external collaborator that materializes the
//! system-under-test's source tree before it is compiled. Out of scope per
//! §1's non-goals; this module only types the seam.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{Result, TestError};

/// Fetches the system-under-test source into `dest`. The default
/// implementation shells out to `git`.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        repo: &str,
        branch: Option<&str>,
        commit: Option<&str>,
        dest: &Path,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct GitFetcher;

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(
        &self,
        repo: &str,
        branch: Option<&str>,
        commit: Option<&str>,
        dest: &Path,
    ) -> Result<()> {
        info!(%repo, ?branch, ?commit, ?dest, "fetching source");
        let mut clone = Command::new("git");
        clone.arg("clone");
        if let Some(branch) = branch {
            clone.arg("--branch").arg(branch);
        }
        clone.arg(repo).arg(dest);
        let status = clone.status().await.map_err(TestError::Io)?;
        if !status.success() {
            return Err(TestError::FetchFailed {
                message: format!("git clone exited with {status}"),
            });
        }

        if let Some(commit) = commit {
            let status = Command::new("git")
                .arg("-C")
                .arg(dest)
                .arg("checkout")
                .arg(commit)
                .status()
                .await
                .map_err(TestError::Io)?;
            if !status.success() {
                return Err(TestError::FetchFailed {
                    message: format!("git checkout {commit} exited with {status}"),
                });
            }
        }
        Ok(())
    }
}
