//! Core-file discovery and post-mortem backtrace extraction via `gdb`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::process::Command;
use tracing::warn;

/// Find the most recently modified regular file in `dir` whose name
/// contains `pattern`. Returns `None` if the directory is missing, empty,
/// or no entry matches.
pub fn find_latest_core_file(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name()?.to_string_lossy().to_string();
        if !name.contains(pattern) {
            continue;
        }
        let modified = entry.metadata().ok()?.modified().ok()?;
        if best.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            best = Some((modified, path));
        }
    }
    best.map(|(_, path)| path)
}

/// Invoke `gdb` in batch mode against `executable`/`core_file` and return
/// the backtrace text emitted after the `backtrace start` marker. Returns
/// `None` on any failure (missing debugger, malformed core, etc.) — a
/// missing backtrace must never fail the case harder than the crash already did.
pub async fn get_core_backtrace(executable: &Path, core_file: &Path) -> Option<String> {
    let output = Command::new("gdb")
        .arg(executable)
        .arg(core_file)
        .arg("-ex")
        .arg("echo backtrace start\\n")
        .arg("-ex")
        .arg("backtrace")
        .arg("--batch")
        .output()
        .await
        .map_err(|e| warn!(error = %e, "failed to spawn gdb"))
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let marker = "backtrace start";
    let start = stdout.find(marker)? + marker.len();
    let backtrace: String = stdout[start..]
        .lines()
        .skip_while(|l| l.trim().is_empty())
        .take(15)
        .collect::<Vec<_>>()
        .join("\n");
    if backtrace.trim().is_empty() {
        None
    } else {
        Some(backtrace)
    }
}
