//! BT-011: Local execution via `bash -c`.

use super::ExecOutput;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run `command` with `bash -c`, capturing stdout and stderr. Stdin is
/// inherited so prompts such as `sudo` still reach the terminal.
/// A process killed by a signal reports exit code -1.
pub fn exec_local(command: &str) -> Result<ExecOutput, String> {
    debug!(command, "running");
    let output = Command::new("bash")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!(exit_code, "finished");
    Ok(ExecOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
