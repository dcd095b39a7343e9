//! BT-007: Recipe expansion. Inline invocations into flat shell commands.
//!
//! A recipe's method list is walked in order. Shell commands get their
//! `$(( param ))` references replaced by the invocation's argument values;
//! nested invocations are expanded in place with the callee's own parameter
//! list. Target-level shell commands are emitted verbatim.

use super::error::ExpandError;
use super::types::*;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// Deepest chain of nested invocations expanded before giving up.
pub const MAX_RECIPE_DEPTH: usize = 64;

/// `$(( name ))` with optional whitespace inside the delimiters.
static PARAM_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(\(\s*([A-Za-z0-9_.-]+)\s*\)\)").expect("parameter reference pattern")
});

/// Replace every `$(( name ))` reference to one of `parameters` with the
/// matching value. References to other names are left as written, and
/// values are inserted literally.
pub fn substitute(command: &str, parameters: &[String], values: &[String]) -> String {
    PARAM_REF
        .replace_all(command, |caps: &Captures| {
            parameters
                .iter()
                .position(|p| *p == caps[1])
                .and_then(|i| values.get(i))
                .map_or_else(|| caps[0].to_string(), Clone::clone)
        })
        .into_owned()
}

/// Expand one invocation of a recipe for `method` into shell commands.
pub fn expand_invocation(
    recipes: &RecipeIndex,
    invocation: &RecipeInvocation,
    method: Method,
) -> Result<Vec<String>, ExpandError> {
    let mut commands = Vec::new();
    let mut chain = Vec::new();
    expand_into(recipes, invocation, method, &mut chain, &mut commands)?;
    Ok(commands)
}

fn expand_into(
    recipes: &RecipeIndex,
    invocation: &RecipeInvocation,
    method: Method,
    chain: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), ExpandError> {
    chain.push(invocation.name.clone());
    if chain.len() > MAX_RECIPE_DEPTH {
        return Err(ExpandError::RecursionLimit {
            limit: MAX_RECIPE_DEPTH,
            chain: chain.clone(),
        });
    }

    let recipe = recipes
        .get(&invocation.name)
        .ok_or_else(|| ExpandError::UnknownRecipe(invocation.name.clone()))?;
    if invocation.args.len() != recipe.parameters.len() {
        return Err(ExpandError::Arity {
            recipe: recipe.name.clone(),
            expected: recipe.parameters.len(),
            actual: invocation.args.len(),
        });
    }
    let executables = recipe
        .method(method)
        .ok_or_else(|| ExpandError::MissingMethod {
            recipe: recipe.name.clone(),
            method: method.to_string(),
        })?;

    let values = invocation.arg_values();
    for executable in executables {
        match executable {
            Executable::Shell(command) => {
                out.push(substitute(command, &recipe.parameters, &values));
            }
            Executable::Recipe(nested) => {
                // Arguments of a nested call may forward this recipe's parameters.
                let args: Vec<Vec<String>> = nested
                    .args
                    .iter()
                    .map(|group| {
                        group
                            .iter()
                            .map(|token| substitute(token, &recipe.parameters, &values))
                            .collect()
                    })
                    .collect();
                let forwarded = RecipeInvocation::new(nested.name.clone(), args);
                expand_into(recipes, &forwarded, method, chain, out)?;
            }
        }
    }

    chain.pop();
    Ok(())
}

/// Expand a target-level executable list. Shell commands pass through
/// untouched; invocations are inlined.
pub fn expand_executables(
    recipes: &RecipeIndex,
    executables: &[Executable],
    method: Method,
) -> Result<Vec<String>, ExpandError> {
    let mut commands = Vec::new();
    for executable in executables {
        match executable {
            Executable::Shell(command) => commands.push(command.clone()),
            Executable::Recipe(invocation) => {
                commands.extend(expand_invocation(recipes, invocation, method)?);
            }
        }
    }
    Ok(commands)
}

/// Commands a target runs for `method`, honoring the `recipe` shortcut.
/// A target with nothing declared for the method yields no commands.
pub fn target_commands(
    recipes: &RecipeIndex,
    definition: &TargetDefinition,
    method: Method,
) -> Result<Vec<String>, ExpandError> {
    let commands = match target_executables(definition, method) {
        Some(executables) => expand_executables(recipes, executables, method)?,
        None => Vec::new(),
    };
    debug!(%method, commands = commands.len(), "expanded target commands");
    Ok(commands)
}
