//! BT-002: Error taxonomy. Parse, validation, and expansion failures.
//!
//! Every variant here is fatal and raised before any command runs. Target
//! execution failures are not errors; they are recorded outcomes that drive
//! skip propagation.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, BootyError>;

/// Malformed source text, with a 1-based location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}:{line}:{column}: {message}")]
pub struct ParseError {
    pub source_name: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(source_name: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// Failure while inlining recipe invocations into shell commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("recipe '{0}' does not exist")]
    UnknownRecipe(String),

    #[error("recipe '{recipe}' has no {method} method")]
    MissingMethod { recipe: String, method: String },

    #[error("recipe '{recipe}' expects {expected} args but was invoked with {actual}")]
    Arity {
        recipe: String,
        expected: usize,
        actual: usize,
    },

    #[error("recipe expansion exceeded depth {limit}: {}", chain.join(" -> "))]
    RecursionLimit { limit: usize, chain: Vec<String> },
}

/// Top-level error for loading, validating, and expanding a configuration.
#[derive(Error, Debug)]
pub enum BootyError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("missing definition for target '{target}', don't know how to install")]
    MissingDefinition { target: String },

    #[error("incomplete definition for target '{target}': {method} is {problem}")]
    IncompleteDefinition {
        target: String,
        method: String,
        problem: String,
    },

    #[error("cycle detected in dependency graph: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("recipe '{recipe}' invoked by target '{target}' does not exist")]
    UnknownRecipe { target: String, recipe: String },

    #[error(
        "recipe '{recipe}' invoked by target '{target}' has {expected} args but was invoked with {actual} args"
    )]
    ArityMismatch {
        target: String,
        recipe: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot expand {method} for target '{target}': {source}")]
    Expansion {
        target: String,
        method: String,
        #[source]
        source: ExpandError,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
