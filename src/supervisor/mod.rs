//! The server supervisor (C2): spawn, readiness-probe, stop, and
//! crash-diagnose a system-under-test process.

mod backtrace;
mod procfs;

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::TestUserError;
use crate::model::ServerOptions;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const READY_TIMEOUT: Duration = Duration::from_secs(10);
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Endpoint a wire client connects to once the supervised server is ready.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

/// Owns exactly one system-under-test process for the duration of a test
/// case. Not `Clone`, not `Sync` — the case executor holds it behind a
/// single `&mut` for its whole lifetime, mirroring the "one case, one
/// supervisor" contract.
pub struct Supervisor {
    config: ServerConfig,
    child: Option<Child>,
    last_backtrace: Option<String>,
}

impl Supervisor {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            child: None,
            last_backtrace: None,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        if self.config.use_unix_socket {
            Endpoint::Unix(self.config.unix_socket_path())
        } else {
            Endpoint::Tcp {
                host: "127.0.0.1".to_string(),
                port: self.config.server_port,
            }
        }
    }

    /// The most recent crash backtrace, if the last stop observed a crash.
    pub fn last_backtrace(&self) -> Option<&str> {
        self.last_backtrace.as_deref()
    }

    /// Spawn the server, wait for it to become ready, or fail.
    ///
    /// The child is placed in its own process group via `setsid` so that
    /// `stop` can signal the whole group even if the binary itself forks
    /// (or, when a user-switch wrapper is configured, so the wrapper and
    /// its child are both reachable by one `killpg`).
    pub async fn start(&mut self, options: &ServerOptions) -> Result<(), TestUserError> {
        if let Some(core_dir) = &self.config.core_path {
            purge_directory(core_dir);
        }
        if self.config.clean_data_dir_on_start {
            purge_directory(&self.config.db_data_dir);
        }
        std::fs::create_dir_all(&self.config.db_data_dir).ok();

        let mut cmd = Command::new(&self.config.observer_path);
        cmd.arg("-f").arg(&self.config.db_config);
        if self.config.use_unix_socket {
            cmd.arg("-s").arg(self.config.unix_socket_path());
        } else {
            cmd.arg("-p").arg(self.config.server_port.to_string());
        }
        if let Some(trx) = &options.trx_model {
            cmd.arg("-t").arg(trx);
        }
        if let Some(proto) = &options.protocol {
            cmd.arg("-P").arg(proto);
        }
        if let Some(engine) = &options.storage_engine {
            cmd.arg("-E").arg(engine);
        }
        cmd.current_dir(&self.config.db_data_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // SAFETY: setsid() is async-signal-safe and is the only call made
        // between fork and exec in this hook.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        info!(observer = %self.config.observer_path.display(), "starting server");
        let child = cmd.spawn().map_err(TestUserError::Io)?;
        self.child = Some(child);
        self.last_backtrace = None;

        let deadline = std::time::Instant::now() + READY_TIMEOUT;
        while std::time::Instant::now() < deadline {
            if let Some(child) = &mut self.child {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(TestUserError::ServerCrashed {
                        status: status.to_string(),
                    });
                }
            }
            if self.probe_once().await {
                info!("server ready");
                return Ok(());
            }
            sleep(READY_POLL_INTERVAL).await;
        }
        Err(TestUserError::ServerNotReady(READY_TIMEOUT))
    }

    async fn probe_once(&self) -> bool {
        match self.endpoint() {
            Endpoint::Tcp { host, port } => {
                timeout(Duration::from_millis(500), TcpStream::connect((host.as_str(), port)))
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false)
            }
            Endpoint::Unix(path) => {
                timeout(
                    Duration::from_millis(500),
                    tokio::net::UnixStream::connect(&path),
                )
                .await
                .map(|r| r.is_ok())
                .unwrap_or(false)
            }
        }
    }

    /// Send `SIGTERM` to the process group, wait up to the grace period,
    /// escalate to `SIGKILL` if still alive. On a crash exit, attempts to
    /// recover a backtrace before returning.
    pub async fn stop(&mut self) -> Result<(), TestUserError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let Some(pid) = child.id() else {
            return Ok(());
        };
        let pgid = Pid::from_raw(pid as i32);

        signal::killpg(pgid, Signal::SIGTERM).ok();
        let exited = timeout(STOP_GRACE_PERIOD, child.wait()).await;

        let status = match exited {
            Ok(Ok(status)) => Some(status),
            _ => {
                warn!("server did not exit within grace period, sending SIGKILL");
                signal::killpg(pgid, Signal::SIGKILL).ok();
                child.wait().await.ok()
            }
        };

        if let Some(status) = status {
            if !status.success() {
                self.last_backtrace = self.collect_backtrace().await;
            }
        }
        Ok(())
    }

    /// `Restart`'s forced variant: skip the graceful `SIGTERM` window
    /// entirely and send `SIGKILL` straight away.
    pub async fn force_stop(&mut self) -> Result<(), TestUserError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let Some(pid) = child.id() else {
            return Ok(());
        };
        let pgid = Pid::from_raw(pid as i32);
        signal::killpg(pgid, Signal::SIGKILL).ok();
        let status = child.wait().await.ok();
        if let Some(status) = status {
            if !status.success() {
                self.last_backtrace = self.collect_backtrace().await;
            }
        }
        Ok(())
    }

    async fn collect_backtrace(&self) -> Option<String> {
        let core_dir = self.config.core_path.as_ref()?;
        let core_file = backtrace::find_latest_core_file(core_dir, "core")?;
        backtrace::get_core_backtrace(&self.config.observer_path, &core_file).await
    }

    /// Fallback teardown: kill every live process matching the supervised
    /// binary's resolved executable path, regardless of process-group
    /// membership. Needed when the server was launched via an intermediate
    /// shell (e.g. a user-switch wrapper) that direct `killpg` cannot reach.
    pub fn stop_all_matching(&self) -> usize {
        procfs::kill_all_matching(&self.config.observer_path)
    }

    /// Remove the data directory contents, leaving the directory itself.
    pub fn clean(&self) {
        purge_directory(&self.config.db_data_dir);
    }
}

fn purge_directory(dir: &std::path::Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path).ok();
        } else {
            std::fs::remove_file(&path).ok();
        }
    }
}
