//! BT-011: Command transport. Run one command string, capture its output.

pub mod local;

/// Output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands on behalf of the status and install passes.
///
/// `Err` means the command could not be run at all (spawn or wait failure),
/// not that it exited non-zero.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<ExecOutput, String>;
}

/// Runs commands on this machine with `bash -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&self, command: &str) -> Result<ExecOutput, String> {
        local::exec_local(command)
    }
}
