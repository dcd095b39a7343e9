//! BT-012: Per-target output files for failed and missing checks.
//!
//! Layout: `<log_dir>/<unix_millis>/<method>/<target>_stdout.log` and
//! `..._stderr.log`. One timestamped directory per logger, so each run keeps
//! its own output.

use crate::core::types::Method;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct TargetLogger {
    run_dir: PathBuf,
}

impl TargetLogger {
    /// Logger writing under a fresh `<log_dir>/<unix_millis>` directory.
    /// Nothing is created until the first write.
    pub fn new(log_dir: &Path) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self::in_dir(log_dir.join(millis.to_string()))
    }

    /// Logger writing directly under `run_dir`.
    pub fn in_dir(run_dir: PathBuf) -> Self {
        Self { run_dir }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn stdout_path(&self, target: &str, method: Method) -> PathBuf {
        self.run_dir
            .join(method.as_str())
            .join(format!("{}_stdout.log", target))
    }

    pub fn stderr_path(&self, target: &str, method: Method) -> PathBuf {
        self.run_dir
            .join(method.as_str())
            .join(format!("{}_stderr.log", target))
    }

    /// Write captured output for one target and method.
    pub fn log(
        &self,
        target: &str,
        method: Method,
        stdout: &str,
        stderr: &str,
    ) -> Result<(), String> {
        let dir = self.run_dir.join(method.as_str());
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("cannot create log dir {}: {}", dir.display(), e))?;

        write_section(&self.stdout_path(target, method), "stdout", stdout)?;
        write_section(&self.stderr_path(target, method), "stderr", stderr)
    }
}

fn write_section(path: &Path, label: &str, body: &str) -> Result<(), String> {
    let content = format!("=== {}: ===\n{}", label, body);
    std::fs::write(path, content).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
