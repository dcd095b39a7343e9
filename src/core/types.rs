//! BT-001: Data model for targets, recipes, and the three semantic indices.
//!
//! All index types derive Serialize/Deserialize so `booty inspect` can dump
//! them as YAML. Maps are `IndexMap` so declaration order survives indexing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Methods
// ============================================================================

/// Method key for the install step.
pub const SETUP: &str = "setup";

/// Method key for the installation check.
pub const IS_SETUP: &str = "is_setup";

/// Shortcut key: one executable list standing in for both methods.
pub const RECIPE_SHORTCUT: &str = "recipe";

/// One of the two recognized methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Setup,
    IsSetup,
}

impl Method {
    /// Method key as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => SETUP,
            Self::IsSetup => IS_SETUP,
        }
    }

    /// Parse a method name from source. Anything else is unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            SETUP => Some(Self::Setup),
            IS_SETUP => Some(Self::IsSetup),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Executables
// ============================================================================

/// A unit of setup/check logic: a literal shell script or a recipe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Executable {
    /// Script run verbatim with `bash -c`
    Shell(String),

    /// Call of a named recipe with positional argument groups
    Recipe(RecipeInvocation),
}

impl Executable {
    /// Convenience constructor for shell commands.
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell(command.into())
    }
}

/// `name(arg1 arg2, arg1b, ...)`, each inner list is one parameter's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInvocation {
    /// Name of the invoked recipe
    pub name: String,

    /// One token list per declared parameter
    #[serde(default)]
    pub args: Vec<Vec<String>>,
}

impl RecipeInvocation {
    pub fn new(name: impl Into<String>, args: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Effective parameter values: each token group joined with spaces.
    pub fn arg_values(&self) -> Vec<String> {
        self.args.iter().map(|group| group.join(" ")).collect()
    }
}

/// Merge every run of consecutive shell commands into one, joined by newlines.
///
/// `[Shell("x"), Shell("y"), Recipe, Shell("z")]` becomes
/// `[Shell("x\ny"), Recipe, Shell("z")]`. Each command is trimmed first, so
/// compacting an already compacted list is a no-op. Recipe invocations are
/// never merged.
pub fn compact_shell_executables(executables: Vec<Executable>) -> Vec<Executable> {
    let mut compacted: Vec<Executable> = Vec::with_capacity(executables.len());
    for executable in executables {
        match executable {
            Executable::Recipe(_) => compacted.push(executable),
            Executable::Shell(command) => {
                let command = command.trim();
                match compacted.last_mut() {
                    Some(Executable::Shell(previous)) => {
                        previous.push('\n');
                        previous.push_str(command);
                    }
                    _ => compacted.push(Executable::Shell(command.to_string())),
                }
            }
        }
    }
    compacted
}

// ============================================================================
// Indices
// ============================================================================

/// Method name (`setup`, `is_setup`, or `recipe`) → ordered executables.
pub type TargetDefinition = IndexMap<String, Vec<Executable>>;

/// Target name → its executable definition.
pub type ExecutableIndex = IndexMap<String, TargetDefinition>;

/// Target name → names it depends on (never absent once mentioned).
pub type DependencyIndex = IndexMap<String, Vec<String>>;

/// Recipe name → definition.
pub type RecipeIndex = IndexMap<String, RecipeDefinition>;

/// Executables a target runs for a method: the method's own list, or the
/// `recipe` shortcut list when the method is not declared.
pub fn target_executables(definition: &TargetDefinition, method: Method) -> Option<&[Executable]> {
    definition
        .get(method.as_str())
        .or_else(|| definition.get(RECIPE_SHORTCUT))
        .map(Vec::as_slice)
}

/// A reusable, parameterized template for setup/check logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Recipe name
    pub name: String,

    /// Declared parameter names, in order
    #[serde(default)]
    pub parameters: Vec<String>,

    /// Method name → executables (may contain nested invocations)
    #[serde(default)]
    pub defs: IndexMap<String, Vec<Executable>>,
}

impl RecipeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Executables for a method, if the recipe defines it.
    pub fn method(&self, method: Method) -> Option<&[Executable]> {
        self.defs.get(method.as_str()).map(Vec::as_slice)
    }
}

// ============================================================================
// Pass results
// ============================================================================

/// Outcome of a target's `is_setup` check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Installed,
    Missing,
    Error,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "INSTALLED"),
            Self::Missing => write!(f, "NOT INSTALLED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of a target during the install pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    Installed,
    Failed,
    Skipped,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "INSTALLED"),
            Self::Failed => write!(f, "ERROR"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Result of the status pass.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub installed: Vec<String>,
    pub missing: Vec<String>,
    pub errors: Vec<String>,
    pub total_duration: std::time::Duration,
}

impl StatusReport {
    /// Targets the install pass should attempt.
    pub fn needs_install(&self) -> impl Iterator<Item = &String> {
        self.missing.iter().chain(self.errors.iter())
    }
}

/// Result of the install pass.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub errors: Vec<String>,
    pub skipped: Vec<String>,
    pub total_duration: std::time::Duration,
}

impl InstallReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Run events
// ============================================================================

/// Event for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        pass: String,
        booty_version: String,
    },
    TargetChecked {
        target: String,
        status: TargetStatus,
        duration_seconds: f64,
    },
    TargetInstalled {
        target: String,
        duration_seconds: f64,
    },
    TargetFailed {
        target: String,
        method: Method,
        exit_code: i32,
    },
    TargetSkipped {
        target: String,
    },
    RunCompleted {
        run_id: String,
        pass: String,
        succeeded: u32,
        failed: u32,
        skipped: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

// ============================================================================
// Tests
// ============================================================================
