//! BT-003: Syntax tree produced by the front end.
//!
//! The tree mirrors the source closely; turning it into indices is the
//! indexer's job.

use super::types::{Method, RecipeInvocation};

/// A parsed source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub items: Vec<Item>,
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Recipe(RecipeNode),
    Target(TargetNode),
    Dependency(DependencyNode),
}

/// `recipe NAME(params):` followed by method definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeNode {
    pub name: String,
    pub params: Vec<String>,
    pub methods: Vec<MethodNode>,
    pub line: usize,
}

/// `NAME:` followed by method definitions, or `NAME: invocation(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNode {
    pub name: String,
    pub body: TargetBody,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetBody {
    Methods(Vec<MethodNode>),
    Shortcut(RecipeInvocation),
}

/// `setup: ...` or `is_setup: ...`, single-line or indented block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub method: Method,
    pub body: Vec<Statement>,
    pub line: usize,
}

/// One body entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Shell(String),
    Invocation(RecipeInvocation),
}

/// Direction of a dependency declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `A -> B C`: A depends on B and C
    DependsOn,
    /// `A <- B C`: B and C depend on A
    DependedUpon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub subject: String,
    pub direction: Direction,
    pub others: Vec<String>,
    pub line: usize,
}

impl SourceFile {
    pub fn targets(&self) -> impl Iterator<Item = &TargetNode> {
        self.items.iter().filter_map(|item| match item {
            Item::Target(t) => Some(t),
            _ => None,
        })
    }

    pub fn recipes(&self) -> impl Iterator<Item = &RecipeNode> {
        self.items.iter().filter_map(|item| match item {
            Item::Recipe(r) => Some(r),
            _ => None,
        })
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyNode> {
        self.items.iter().filter_map(|item| match item {
            Item::Dependency(d) => Some(d),
            _ => None,
        })
    }
}
