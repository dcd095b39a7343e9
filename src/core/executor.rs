//! BT-013: Executor. Status and install passes over the dependency graph.
//!
//! status:  install order → expand `is_setup` → run → classify → journal
//! install: traversal → expand `setup` for missing/errored targets → run →
//!          report success back so failures prune their dependents

use super::loader::BootyData;
use super::recipe::target_commands;
use super::types::*;
use crate::journal::eventlog;
use crate::journal::target_log::TargetLogger;
use crate::transport::{CommandRunner, ExecOutput};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exit code an `is_setup` command uses to say "not installed".
pub const NOT_INSTALLED_EXIT_CODE: i32 = 1;

/// Inputs shared by both passes.
pub struct PassConfig<'a> {
    pub data: &'a BootyData,
    pub runner: &'a dyn CommandRunner,
    /// Journal root; `None` disables output files and the event log
    pub log_dir: Option<&'a Path>,
}

/// One finished target, handed to the caller as soon as it is known.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProgress {
    pub target: String,
    /// `INSTALLED`, `NOT INSTALLED`, `ERROR` or `SKIPPED`
    pub state: String,
    /// Command preview or the captured output explaining the state
    pub detail: String,
    pub duration: Duration,
}

/// Journal handles for one pass.
struct Journal<'a> {
    log_dir: Option<&'a Path>,
    targets: Option<TargetLogger>,
    run_id: String,
}

impl<'a> Journal<'a> {
    fn open(log_dir: Option<&'a Path>) -> Self {
        Self {
            log_dir,
            targets: log_dir.map(TargetLogger::new),
            run_id: eventlog::generate_run_id(),
        }
    }

    fn event(&self, event: RunEvent) {
        if let Some(dir) = self.log_dir {
            if let Err(e) = eventlog::append_event(dir, event) {
                warn!(error = %e, "cannot append run event");
            }
        }
    }

    fn output(&self, target: &str, method: Method, output: &ExecOutput) {
        if let Some(logger) = &self.targets {
            if let Err(e) = logger.log(target, method, &output.stdout, &output.stderr) {
                warn!(target_name = target, error = %e, "cannot write target log");
            }
        }
    }
}

/// First expanded command, newlines escaped, cut to 60 characters, with
/// `...` appended when anything was left out.
pub fn display_commands(commands: &[String]) -> String {
    const WIDTH: usize = 60;
    let Some(first) = commands.first() else {
        return String::new();
    };
    let first = first.trim();
    let escaped = first.replace('\n', "\\n");
    let shown: String = escaped.chars().take(WIDTH).collect();
    let more = commands.len() > 1 || first.contains('\n') || shown.len() < escaped.len();
    if more {
        format!("{}...", shown)
    } else {
        shown
    }
}

/// Run commands in order, stopping at the first non-zero exit. Returns the
/// failing output, or `None` when every command succeeded.
fn run_commands(runner: &dyn CommandRunner, commands: &[String]) -> Option<ExecOutput> {
    for command in commands {
        let output = match runner.run(command) {
            Ok(output) => output,
            Err(e) => ExecOutput {
                exit_code: -1,
                stdout: String::new(),
                stderr: e,
            },
        };
        if !output.success() {
            return Some(output);
        }
    }
    None
}

/// Classify a failed `is_setup` run.
fn classify(failure: Option<&ExecOutput>) -> TargetStatus {
    match failure {
        None => TargetStatus::Installed,
        Some(out) if out.exit_code == NOT_INSTALLED_EXIT_CODE => TargetStatus::Missing,
        Some(_) => TargetStatus::Error,
    }
}

fn commands_for(data: &BootyData, target: &str, method: Method) -> Result<Vec<String>, String> {
    let definition = data
        .executables
        .get(target)
        .ok_or_else(|| format!("no definition for target '{}'", target))?;
    target_commands(&data.recipes, definition, method).map_err(|e| e.to_string())
}

fn single_line(text: &str) -> String {
    text.trim().replace('\n', " ")
}

// ============================================================================
// Status pass
// ============================================================================

/// Check every target in dependency order.
pub fn check_status(cfg: &PassConfig, mut on_target: impl FnMut(&TargetProgress)) -> StatusReport {
    let start = Instant::now();
    let journal = Journal::open(cfg.log_dir);
    journal.event(RunEvent::RunStarted {
        run_id: journal.run_id.clone(),
        pass: "status".to_string(),
        booty_version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let mut report = StatusReport::default();
    for target in cfg.data.graph.install_order() {
        let target_start = Instant::now();
        let (status, detail) = match commands_for(cfg.data, &target, Method::IsSetup) {
            Ok(commands) => {
                let failure = run_commands(cfg.runner, &commands);
                let status = classify(failure.as_ref());
                let detail = match (&status, &failure) {
                    (TargetStatus::Missing, Some(out)) if !out.stdout.trim().is_empty() => {
                        single_line(&out.stdout)
                    }
                    (TargetStatus::Error, Some(out)) => single_line(&out.stderr),
                    _ => display_commands(&commands),
                };
                if let Some(out) = &failure {
                    journal.output(&target, Method::IsSetup, out);
                }
                (status, detail)
            }
            Err(e) => (TargetStatus::Error, e),
        };
        let duration = target_start.elapsed();
        debug!(target_name = %target, %status, "checked target");

        journal.event(RunEvent::TargetChecked {
            target: target.clone(),
            status: status.clone(),
            duration_seconds: duration.as_secs_f64(),
        });
        on_target(&TargetProgress {
            target: target.clone(),
            state: status.to_string(),
            detail,
            duration,
        });

        match status {
            TargetStatus::Installed => report.installed.push(target),
            TargetStatus::Missing => report.missing.push(target),
            TargetStatus::Error => report.errors.push(target),
        }
    }

    report.total_duration = start.elapsed();
    journal.event(RunEvent::RunCompleted {
        run_id: journal.run_id.clone(),
        pass: "status".to_string(),
        succeeded: report.installed.len() as u32,
        failed: report.errors.len() as u32,
        skipped: 0,
        total_seconds: report.total_duration.as_secs_f64(),
    });
    report
}

// ============================================================================
// Install pass
// ============================================================================

/// Install every target the status pass found missing or errored, in
/// dependency order. A failed target prunes all of its dependents.
pub fn install_missing(
    cfg: &PassConfig,
    status: &StatusReport,
    mut on_target: impl FnMut(&TargetProgress),
) -> InstallReport {
    let start = Instant::now();
    let journal = Journal::open(cfg.log_dir);
    journal.event(RunEvent::RunStarted {
        run_id: journal.run_id.clone(),
        pass: "install".to_string(),
        booty_version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let needed: HashSet<&str> = status.needs_install().map(String::as_str).collect();
    let mut report = InstallReport::default();

    let skipped = cfg.data.graph.walk(|target| {
        if !needed.contains(target) {
            return true;
        }

        let target_start = Instant::now();
        let (succeeded, detail) = match commands_for(cfg.data, target, Method::Setup) {
            Ok(commands) => match run_commands(cfg.runner, &commands) {
                None => (true, display_commands(&commands)),
                Some(out) => {
                    journal.output(target, Method::Setup, &out);
                    journal.event(RunEvent::TargetFailed {
                        target: target.to_string(),
                        method: Method::Setup,
                        exit_code: out.exit_code,
                    });
                    (false, single_line(&out.stderr))
                }
            },
            Err(e) => (false, e),
        };
        let duration = target_start.elapsed();

        let outcome = if succeeded {
            journal.event(RunEvent::TargetInstalled {
                target: target.to_string(),
                duration_seconds: duration.as_secs_f64(),
            });
            report.installed.push(target.to_string());
            InstallOutcome::Installed
        } else {
            report.errors.push(target.to_string());
            InstallOutcome::Failed
        };
        debug!(target_name = target, %outcome, "install attempted");
        on_target(&TargetProgress {
            target: target.to_string(),
            state: outcome.to_string(),
            detail,
            duration,
        });
        succeeded
    });

    for target in &skipped {
        journal.event(RunEvent::TargetSkipped {
            target: target.clone(),
        });
        on_target(&TargetProgress {
            target: target.clone(),
            state: InstallOutcome::Skipped.to_string(),
            detail: "dependency failure".to_string(),
            duration: Duration::ZERO,
        });
    }
    report.skipped = skipped;
    report.total_duration = start.elapsed();

    journal.event(RunEvent::RunCompleted {
        run_id: journal.run_id.clone(),
        pass: "install".to_string(),
        succeeded: report.installed.len() as u32,
        failed: report.errors.len() as u32,
        skipped: report.skipped.len() as u32,
        total_seconds: report.total_duration.as_secs_f64(),
    });
    report
}
