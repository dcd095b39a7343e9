//! BT-008: Validation. Structural, cycle, recipe, and expansion checks.
//!
//! Runs once after indexing and before any command executes. The first
//! failing check wins, in this order:
//! 1. every target in install order has an executable definition
//! 2. each definition has a `recipe` shortcut or both `setup` and `is_setup`
//! 3. the dependency graph is acyclic
//! 4. every invoked recipe exists
//! 5. every invocation passes as many argument groups as the recipe declares
//! 6. every target's commands expand (catches recursive recipes)

use super::error::{BootyError, Result};
use super::graph::DependencyGraph;
use super::recipe::target_commands;
use super::types::*;
use tracing::debug;

/// Check indices and graph. Returns the first problem found.
pub fn validate(
    executables: &ExecutableIndex,
    recipes: &RecipeIndex,
    graph: &DependencyGraph,
) -> Result<()> {
    let order = graph.install_order();

    check_definitions(executables, &order)?;
    check_cycles(graph)?;
    check_invocations(executables, recipes)?;
    check_expansion(executables, recipes)?;

    debug!(targets = executables.len(), recipes = recipes.len(), "validation passed");
    Ok(())
}

fn non_empty(definition: &TargetDefinition, key: &str) -> bool {
    definition.get(key).is_some_and(|list| !list.is_empty())
}

fn check_definitions(executables: &ExecutableIndex, order: &[String]) -> Result<()> {
    for target in order {
        let definition = executables
            .get(target)
            .ok_or_else(|| BootyError::MissingDefinition {
                target: target.clone(),
            })?;

        if non_empty(definition, RECIPE_SHORTCUT) {
            continue;
        }
        for key in [SETUP, IS_SETUP] {
            if !non_empty(definition, key) {
                let problem = if definition.contains_key(key) {
                    "empty"
                } else {
                    "missing"
                };
                return Err(BootyError::IncompleteDefinition {
                    target: target.clone(),
                    method: key.to_string(),
                    problem: problem.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_cycles(graph: &DependencyGraph) -> Result<()> {
    match graph.find_first_cycle() {
        Some(path) => Err(BootyError::CyclicDependency { path }),
        None => Ok(()),
    }
}

fn invocations(definition: &TargetDefinition) -> impl Iterator<Item = &RecipeInvocation> {
    definition.values().flatten().filter_map(|executable| match executable {
        Executable::Recipe(invocation) => Some(invocation),
        Executable::Shell(_) => None,
    })
}

fn check_invocations(executables: &ExecutableIndex, recipes: &RecipeIndex) -> Result<()> {
    for (target, definition) in executables {
        for invocation in invocations(definition) {
            if !recipes.contains_key(&invocation.name) {
                return Err(BootyError::UnknownRecipe {
                    target: target.clone(),
                    recipe: invocation.name.clone(),
                });
            }
        }
    }

    for (target, definition) in executables {
        for invocation in invocations(definition) {
            let Some(recipe) = recipes.get(&invocation.name) else {
                continue;
            };
            if invocation.args.len() != recipe.parameters.len() {
                return Err(BootyError::ArityMismatch {
                    target: target.clone(),
                    recipe: invocation.name.clone(),
                    expected: recipe.parameters.len(),
                    actual: invocation.args.len(),
                });
            }
        }
    }
    Ok(())
}

fn check_expansion(executables: &ExecutableIndex, recipes: &RecipeIndex) -> Result<()> {
    for (target, definition) in executables {
        for method in [Method::Setup, Method::IsSetup] {
            target_commands(recipes, definition, method).map_err(|source| {
                BootyError::Expansion {
                    target: target.clone(),
                    method: method.to_string(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExpandError;
    use crate::core::indexer::{dependency_index, executable_index, merge_recipes, recipe_index};
    use crate::core::parser::Parser;
    use crate::core::stdlib;

    fn check(src: &str) -> Result<()> {
        let parser = Parser::new();
        let ast = parser.parse("test.booty", src)?;
        let std_ast = parser.parse("stdlib", stdlib::STDLIB)?;
        let recipes = merge_recipes(recipe_index(&std_ast), recipe_index(&ast));
        let graph = DependencyGraph::from_index(&dependency_index(&ast));
        validate(&executable_index(&ast), &recipes, &graph)
    }

    #[test]
    fn test_bt008_valid_config() {
        let src = "curl: apt(curl)\nrepo: git(https://x.git, ~/x)\nrepo -> curl\n";
        assert!(check(src).is_ok());
    }

    #[test]
    fn test_bt008_missing_definition() {
        let err = check("a: apt(a)\na -> b\n").unwrap_err();
        assert!(matches!(err, BootyError::MissingDefinition { ref target } if target == "b"));
    }

    #[test]
    fn test_bt008_incomplete_definition() {
        let err = check("a:\n  setup: make install\n").unwrap_err();
        match err {
            BootyError::IncompleteDefinition {
                target,
                method,
                problem,
            } => {
                assert_eq!(target, "a");
                assert_eq!(method, IS_SETUP);
                assert_eq!(problem, "missing");
            }
            other => panic!("expected IncompleteDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_bt008_empty_method_reported_as_empty() {
        let mut executables = ExecutableIndex::new();
        let mut def = TargetDefinition::new();
        def.insert(SETUP.to_string(), vec![Executable::shell("make")]);
        def.insert(IS_SETUP.to_string(), vec![]);
        executables.insert("a".to_string(), def);
        let graph = crate::core::graph::DependencyGraphBuilder::new()
            .add_node("a")
            .build();
        let err = validate(&executables, &RecipeIndex::new(), &graph).unwrap_err();
        assert!(matches!(
            err,
            BootyError::IncompleteDefinition { ref problem, .. } if problem == "empty"
        ));
    }

    #[test]
    fn test_bt008_cycle() {
        let err = check("a: apt(a)\nb: apt(b)\na -> b\nb -> a\n").unwrap_err();
        match err {
            BootyError::CyclicDependency { path } => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_bt008_structural_errors_before_cycles() {
        // a <-> b is a cycle, d is mentioned but never defined
        let src = "a: apt(a)\nb: apt(b)\na -> b\nb -> a\nc: apt(c)\nc -> d\n";
        let err = check(src).unwrap_err();
        assert!(matches!(err, BootyError::MissingDefinition { ref target } if target == "d"));
    }

    #[test]
    fn test_bt008_unknown_recipe() {
        let err = check("a: brew(jq)\n").unwrap_err();
        assert!(matches!(
            err,
            BootyError::UnknownRecipe { ref target, ref recipe }
                if target == "a" && recipe == "brew"
        ));
    }

    #[test]
    fn test_bt008_unknown_recipe_in_method_block() {
        let err = check("a:\n  setup: brew(jq)\n  is_setup: which jq\n").unwrap_err();
        assert!(matches!(err, BootyError::UnknownRecipe { .. }));
    }

    #[test]
    fn test_bt008_arity_mismatch() {
        let err = check("repo: git(https://x.git, ~/x, extra)\n").unwrap_err();
        match err {
            BootyError::ArityMismatch {
                target,
                recipe,
                expected,
                actual,
            } => {
                assert_eq!(target, "repo");
                assert_eq!(recipe, "git");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ArityMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_bt008_recursive_recipe_rejected() {
        let src = "recipe spin(x):\n  setup: spin($((x)))\n  is_setup: spin($((x)))\na: spin(y)\n";
        let err = check(src).unwrap_err();
        match err {
            BootyError::Expansion { target, source, .. } => {
                assert_eq!(target, "a");
                assert!(matches!(source, ExpandError::RecursionLimit { .. }));
            }
            other => panic!("expected Expansion, got {other:?}"),
        }
    }

    #[test]
    fn test_bt008_user_recipe_overrides_stdlib() {
        let src = "recipe apt(a, b):\n  setup: echo $((a)) $((b))\n  is_setup: true\njq: apt(jq)\n";
        let err = check(src).unwrap_err();
        assert!(matches!(err, BootyError::ArityMismatch { expected: 2, actual: 1, .. }));
    }
}
