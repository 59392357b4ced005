//! `/proc`-based process enumeration, used as the zombie-sweep fallback
//! when a server was launched through an intermediate shell (e.g. a user
//! switch) and signalling the direct child's process group would miss it.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::path::Path;

/// A live process discovered by scanning `/proc`.
pub struct ProcEntry {
    pub pid: i32,
    pub exe: Option<String>,
}

/// Enumerate all numeric entries under `/proc`, resolving each one's
/// executable path via `readlink /proc/<pid>/exe`. Entries this process
/// cannot read (permission, or the process exited mid-scan) are skipped.
pub fn list_processes() -> Vec<ProcEntry> {
    let mut out = Vec::new();
    let Ok(entries) = fs::read_dir("/proc") else {
        return out;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        let exe_link = Path::new("/proc").join(pid.to_string()).join("exe");
        let exe = fs::read_link(exe_link)
            .ok()
            .map(|p| p.to_string_lossy().to_string());
        out.push(ProcEntry { pid, exe });
    }
    out
}

/// Terminate every live process whose resolved executable path exactly
/// matches `exe_path`. Matching on the resolved path (not process name) is
/// required: multiple harness instances running the same server binary
/// under different names must not interfere, but two processes that
/// happen to share a name must not be conflated either.
pub fn kill_all_matching(exe_path: &Path) -> usize {
    let target = exe_path.to_string_lossy().to_string();
    let mut killed = 0;
    for proc in list_processes() {
        if proc.exe.as_deref() == Some(target.as_str()) {
            if signal::kill(Pid::from_raw(proc.pid), Signal::SIGKILL).is_ok() {
                killed += 1;
            }
        }
    }
    killed
}
