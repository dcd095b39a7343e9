//! BT-010: Load pipeline. Parse, index, merge with the stdlib, validate.

use super::error::{BootyError, Result};
use super::graph::DependencyGraph;
use super::indexer::{dependency_index, executable_index, merge_recipes, recipe_index};
use super::parser::Parser;
use super::stdlib::{STDLIB, STDLIB_SOURCE_NAME};
use super::types::*;
use super::validation::validate;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Everything a run needs, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct BootyData {
    pub executables: ExecutableIndex,
    pub dependencies: DependencyIndex,
    pub recipes: RecipeIndex,
    pub graph: DependencyGraph,
}

/// Index view serialized by `booty inspect`.
#[derive(Debug, Serialize)]
pub struct IndexDump<'a> {
    pub executables: &'a ExecutableIndex,
    pub dependencies: &'a DependencyIndex,
    pub recipes: &'a RecipeIndex,
}

impl BootyData {
    pub fn dump(&self) -> IndexDump<'_> {
        IndexDump {
            executables: &self.executables,
            dependencies: &self.dependencies,
            recipes: &self.recipes,
        }
    }
}

/// Parse and validate configuration text. `source_name` appears in parse
/// error locations.
pub fn load_str(parser: &Parser, source_name: &str, text: &str) -> Result<BootyData> {
    let stdlib = parser.parse(STDLIB_SOURCE_NAME, STDLIB)?;
    let user = parser.parse(source_name, text)?;

    let executables = executable_index(&user);
    let dependencies = dependency_index(&user);
    let recipes = merge_recipes(recipe_index(&stdlib), recipe_index(&user));
    debug!(
        targets = executables.len(),
        dependencies = dependencies.len(),
        recipes = recipes.len(),
        "indexed configuration"
    );

    let graph = DependencyGraph::from_index(&dependencies);
    validate(&executables, &recipes, &graph)?;

    Ok(BootyData {
        executables,
        dependencies,
        recipes,
        graph,
    })
}

/// Read, parse and validate a configuration file.
pub fn load_file(parser: &Parser, path: &Path) -> Result<BootyData> {
    let text = std::fs::read_to_string(path).map_err(|e| BootyError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let data = load_str(parser, &path.display().to_string(), &text)?;
    info!(path = %path.display(), targets = data.graph.len(), "loaded configuration");
    Ok(data)
}
