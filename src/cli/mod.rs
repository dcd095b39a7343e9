//! BT-014: CLI subcommands. Status, install, validate, inspect, init.

use crate::core::executor::{self, PassConfig, TargetProgress};
use crate::core::loader::{self, BootyData};
use crate::core::parser::Parser;
use crate::core::types::StatusReport;
use crate::transport::{CommandRunner, LocalRunner};
use clap::Subcommand;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "install.booty";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check which targets are installed
    Status,

    /// Install missing targets in dependency order
    Install,

    /// Parse and validate the configuration without running anything
    Validate,

    /// Dump the executable, dependency and recipe indices as YAML
    Inspect,

    /// Write a starter install.booty
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: PathBuf,
    pub log_dir: PathBuf,
    /// Install without asking for confirmation
    pub yes: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            log_dir: PathBuf::from("logs"),
            yes: false,
        }
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, settings: &RunSettings) -> Result<(), String> {
    match cmd {
        Commands::Status => cmd_status(settings, &LocalRunner).map(|_| ()),
        Commands::Install => cmd_install(settings, &LocalRunner, &mut prompt_stdin),
        Commands::Validate => cmd_validate(&settings.config),
        Commands::Inspect => cmd_inspect(&settings.config),
        Commands::Init { path } => cmd_init(&path),
    }
}

fn load(config: &Path) -> Result<BootyData, String> {
    loader::load_file(&Parser::new(), config).map_err(|e| e.to_string())
}

fn prompt_stdin(question: &str) -> bool {
    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Width of the target column.
fn name_width(data: &BootyData) -> usize {
    data.graph.names().map(str::len).max().unwrap_or(0)
}

fn print_progress(progress: &TargetProgress, width: usize) {
    println!(
        "  {:<width$}  {:<13}  {} ({:.2}s)",
        progress.target,
        progress.state,
        progress.detail,
        progress.duration.as_secs_f64(),
        width = width
    );
}

fn run_status(
    data: &BootyData,
    settings: &RunSettings,
    runner: &dyn CommandRunner,
) -> StatusReport {
    let cfg = PassConfig {
        data,
        runner,
        log_dir: Some(settings.log_dir.as_path()),
    };
    let width = name_width(data);
    println!("Checking {} target(s):", data.graph.len());
    let report = executor::check_status(&cfg, |p| print_progress(p, width));
    println!();
    println!(
        "Status: {} installed, {} missing, {} error(s) ({:.2}s)",
        report.installed.len(),
        report.missing.len(),
        report.errors.len(),
        report.total_duration.as_secs_f64()
    );
    report
}

fn cmd_status(settings: &RunSettings, runner: &dyn CommandRunner) -> Result<StatusReport, String> {
    let data = load(&settings.config)?;
    let report = run_status(&data, settings, runner);
    if !report.errors.is_empty() {
        return Err(format!("{} target(s) failed their status check", report.errors.len()));
    }
    Ok(report)
}

fn cmd_install(
    settings: &RunSettings,
    runner: &dyn CommandRunner,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<(), String> {
    let data = load(&settings.config)?;
    let status = run_status(&data, settings, runner);

    let pending = status.needs_install().count();
    if pending == 0 {
        println!("Nothing to install.");
        return Ok(());
    }
    if !settings.yes && !confirm(&format!("Install {} target(s)?", pending)) {
        println!("Aborted.");
        return Ok(());
    }

    let cfg = PassConfig {
        data: &data,
        runner,
        log_dir: Some(settings.log_dir.as_path()),
    };
    let width = name_width(&data);
    println!();
    println!("Installing:");
    let report = executor::install_missing(&cfg, &status, |p| print_progress(p, width));

    println!();
    println!("Install report:");
    println!("  {} target(s) installed", report.installed.len());
    println!("  {} target(s) skipped because of dependency failures", report.skipped.len());
    println!("  {} target(s) failed", report.errors.len());
    println!("  Total time: {:.2}s", report.total_duration.as_secs_f64());

    if !report.success() {
        return Err(format!(
            "{} target(s) failed; logs in {}",
            report.errors.len(),
            settings.log_dir.display()
        ));
    }
    Ok(())
}

fn cmd_validate(config: &Path) -> Result<(), String> {
    let data = load(config)?;
    println!(
        "OK: {} ({} targets, {} recipes)",
        config.display(),
        data.executables.len(),
        data.recipes.len()
    );
    Ok(())
}

fn cmd_inspect(config: &Path) -> Result<(), String> {
    let data = load(config)?;
    let yaml = serde_yaml_ng::to_string(&data.dump()).map_err(|e| format!("YAML error: {}", e))?;
    print!("{}", yaml);
    Ok(())
}

const INIT_TEMPLATE: &str = r#"# booty configuration. Run `booty status` to check, `booty install` to install.

curl: apt(curl)
git: apt(git)

dotfiles: git(https://github.com/you/dotfiles.git, ~/.dotfiles)
dotfiles -> git

rust:
    setup: curl https://sh.rustup.rs -sSf | sh -s -- -y
    is_setup: test -x ~/.cargo/bin/cargo
rust -> curl
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(DEFAULT_CONFIG);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&config_path, INIT_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path, config: &str) -> RunSettings {
        let path = dir.join(DEFAULT_CONFIG);
        std::fs::write(&path, config).unwrap();
        RunSettings {
            config: path,
            log_dir: dir.join("logs"),
            yes: true,
        }
    }

    fn marker_config(dir: &Path) -> String {
        let m = dir.display();
        format!(
            "a:\n  setup: touch {m}/a\n  is_setup: test -e {m}/a || exit 1\n\
             b:\n  setup: touch {m}/b\n  is_setup: test -e {m}/b || exit 1\n\
             b -> a\n"
        )
    }

    #[test]
    fn test_bt014_default_settings() {
        let s = RunSettings::default();
        assert_eq!(s.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(s.log_dir, PathBuf::from("logs"));
        assert!(!s.yes);
    }

    #[test]
    fn test_bt014_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        cmd_init(&sub).unwrap();
        let written = sub.join(DEFAULT_CONFIG);
        assert!(written.exists());
        cmd_validate(&written).unwrap();
    }

    #[test]
    fn test_bt014_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_bt014_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), "repo: git(only-one-arg)\n");
        let err = cmd_validate(&s.config).unwrap_err();
        assert!(err.contains("has 2 args but was invoked with 1 args"));
    }

    #[test]
    fn test_bt014_validate_missing_file() {
        let err = cmd_validate(Path::new("/nonexistent/install.booty")).unwrap_err();
        assert!(err.contains("cannot read"));
    }

    #[test]
    fn test_bt014_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), "jq: apt(jq)\n");
        cmd_inspect(&s.config).unwrap();
    }

    #[test]
    fn test_bt014_status_then_install() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), &marker_config(dir.path()));

        let before = cmd_status(&s, &LocalRunner).unwrap();
        assert_eq!(before.missing, vec!["a", "b"]);

        let mut never_asked = |_: &str| -> bool { panic!("--yes skips the prompt") };
        cmd_install(&s, &LocalRunner, &mut never_asked).unwrap();
        assert!(dir.path().join("a").exists());
        assert!(dir.path().join("b").exists());

        let after = cmd_status(&s, &LocalRunner).unwrap();
        assert_eq!(after.installed, vec!["a", "b"]);
        assert!(s.log_dir.join("events.jsonl").exists());
    }

    #[test]
    fn test_bt014_install_declined() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path(), &marker_config(dir.path()));
        s.yes = false;
        let mut asked = false;
        cmd_install(&s, &LocalRunner, &mut |_: &str| {
            asked = true;
            false
        })
        .unwrap();
        assert!(asked);
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn test_bt014_install_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = dir.path().display();
        let config = format!(
            "a:\n  setup: exit 7\n  is_setup: exit 1\n\
             b:\n  setup: touch {m}/b\n  is_setup: test -e {m}/b || exit 1\n\
             b -> a\n"
        );
        let s = settings(dir.path(), &config);
        let err = cmd_install(&s, &LocalRunner, &mut |_: &str| true).unwrap_err();
        assert!(err.contains("1 target(s) failed"));
        assert!(!dir.path().join("b").exists(), "dependent is skipped");
    }

    #[test]
    fn test_bt014_status_error_exit() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), "a:\n  setup: true\n  is_setup: exit 3\n");
        assert!(cmd_status(&s, &LocalRunner).is_err());
    }

    #[test]
    fn test_bt014_dispatch_validate() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), "jq: apt(jq)\n");
        dispatch(Commands::Validate, &s).unwrap();
    }
}
