//! BT-005: Semantic indices extracted from the syntax tree.
//!
//! Three indices come out of a parsed document:
//! - executables: target → method → compacted executable list
//! - dependencies: target → names it depends on, both arrow directions folded in
//! - recipes: recipe → parameters and method definitions
//!
//! The stdlib and the user document are indexed separately and merged with
//! [`merge_recipes`]; user recipes replace stdlib recipes of the same name.

use super::ast::{Direction, MethodNode, SourceFile, Statement, TargetBody};
use super::types::*;
use indexmap::IndexMap;

fn statement_to_executable(statement: &Statement) -> Executable {
    match statement {
        Statement::Shell(command) => Executable::Shell(command.clone()),
        Statement::Invocation(invocation) => Executable::Recipe(invocation.clone()),
    }
}

/// Append each method's statements under its key, then compact each list.
fn index_methods(methods: &[MethodNode], into: &mut IndexMap<String, Vec<Executable>>) {
    for method in methods {
        into.entry(method.method.as_str().to_string())
            .or_default()
            .extend(method.body.iter().map(statement_to_executable));
    }
}

fn compact_all(defs: &mut IndexMap<String, Vec<Executable>>) {
    for executables in defs.values_mut() {
        *executables = compact_shell_executables(std::mem::take(executables));
    }
}

/// Build the executable index. Repeated declarations of a target append to
/// the existing method lists.
pub fn executable_index(source: &SourceFile) -> ExecutableIndex {
    let mut index = ExecutableIndex::new();
    for target in source.targets() {
        let definition = index.entry(target.name.clone()).or_default();
        match &target.body {
            TargetBody::Methods(methods) => index_methods(methods, definition),
            TargetBody::Shortcut(invocation) => definition
                .entry(RECIPE_SHORTCUT.to_string())
                .or_default()
                .push(Executable::Recipe(invocation.clone())),
        }
    }
    for definition in index.values_mut() {
        compact_all(definition);
    }
    index
}

/// Build the recipe index. Repeated definitions of a recipe append to its
/// method lists the way repeated targets do; the parameter list is taken
/// from the latest definition.
pub fn recipe_index(source: &SourceFile) -> RecipeIndex {
    let mut index = RecipeIndex::new();
    for recipe in source.recipes() {
        let definition = index
            .entry(recipe.name.clone())
            .or_insert_with(|| RecipeDefinition::new(recipe.name.clone()));
        definition.parameters = recipe.params.clone();
        index_methods(&recipe.methods, &mut definition.defs);
    }
    for definition in index.values_mut() {
        compact_all(&mut definition.defs);
    }
    index
}

/// Overlay `user` recipes on top of `stdlib`. Same-name recipes are replaced
/// wholesale, not merged per method.
pub fn merge_recipes(stdlib: RecipeIndex, user: RecipeIndex) -> RecipeIndex {
    let mut merged = stdlib;
    for (name, definition) in user {
        merged.insert(name, definition);
    }
    merged
}

/// Declared dependency edge as written: `(subject, direction, others)`.
pub type DependencyDeclaration<'a> = (&'a str, Direction, &'a [String]);

/// Fold declarations into a target → dependencies map.
///
/// Every name in `declared` gets an entry first, in order. `A -> B C` appends
/// B and C to A's list; `A <- B C` appends A to the lists of B and C. Every
/// mentioned name ends up with an entry and lists never hold duplicates.
pub fn normalize_dependencies<'a>(
    declared: impl IntoIterator<Item = &'a str>,
    declarations: impl IntoIterator<Item = DependencyDeclaration<'a>>,
) -> DependencyIndex {
    let mut index = DependencyIndex::new();
    for name in declared {
        index.entry(name.to_string()).or_default();
    }

    fn push_unique(index: &mut DependencyIndex, dependent: &str, dependency: &str) {
        let deps = index.entry(dependent.to_string()).or_default();
        if !deps.iter().any(|d| d == dependency) {
            deps.push(dependency.to_string());
        }
    }

    for (subject, direction, others) in declarations {
        match direction {
            Direction::DependsOn => {
                for other in others {
                    push_unique(&mut index, subject, other);
                }
                for other in others {
                    index.entry(other.clone()).or_default();
                }
            }
            Direction::DependedUpon => {
                index.entry(subject.to_string()).or_default();
                for other in others {
                    push_unique(&mut index, other, subject);
                }
            }
        }
    }
    index
}

/// Build the dependency index for a document.
pub fn dependency_index(source: &SourceFile) -> DependencyIndex {
    normalize_dependencies(
        source.targets().map(|t| t.name.as_str()),
        source
            .dependencies()
            .map(|d| (d.subject.as_str(), d.direction, d.others.as_slice())),
    )
}
