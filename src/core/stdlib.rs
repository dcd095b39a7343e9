//! BT-009: Built-in recipes, parsed beneath every user configuration.

/// Standard recipe library source. User recipes with the same name replace
/// these entirely.
pub const STDLIB: &str = r#"
recipe apt(packages):
    setup: sudo apt-get install -y $((packages))
    is_setup:
      for pkg in $(echo $((packages)) | tr " " "\n"); do
        if ! dpkg -l "$pkg" &> /dev/null; then
          echo "$pkg is not installed."
          exit 1
        fi
      done

recipe pipx(packages):
    setup: pipx install $((packages))
    is_setup: pipx list | grep $((packages))

recipe git(repo dist):
    setup: git clone $((repo)) $((dist))
    is_setup: test -d $((dist))

recipe git_shallow(repo dist):
    setup: git clone --depth 1 $((repo)) $((dist))
    is_setup: test -d $((dist))

recipe ln(src dst):
    setup:
        mkdir -p $(dirname $((dst)))
        ln -fs $((src)) $((dst))
    is_setup: test -L $((dst)) && test -e $((dst))

recipe cp(src dst):
    setup:
        mkdir -p $(dirname $((dst)))
        cp -r $((src)) $((dst))
    is_setup: test -e $((dst))
"#;

/// Source name used in parse errors raised from [`STDLIB`].
pub const STDLIB_SOURCE_NAME: &str = "<stdlib>";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indexer::recipe_index;
    use crate::core::parser::Parser;
    use crate::core::recipe::expand_invocation;
    use crate::core::types::{Method, RecipeInvocation};

    fn stdlib() -> crate::core::types::RecipeIndex {
        recipe_index(&Parser::new().parse(STDLIB_SOURCE_NAME, STDLIB).unwrap())
    }

    #[test]
    fn test_bt009_stdlib_recipes_present() {
        let index = stdlib();
        let names: Vec<_> = index.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["apt", "pipx", "git", "git_shallow", "ln", "cp"]);
        for recipe in index.values() {
            assert!(recipe.method(Method::Setup).is_some(), "{} setup", recipe.name);
            assert!(recipe.method(Method::IsSetup).is_some(), "{} is_setup", recipe.name);
        }
    }

    #[test]
    fn test_bt009_ln_setup_is_one_compacted_command() {
        let index = stdlib();
        let inv = RecipeInvocation::new(
            "ln",
            vec![vec!["~/dots/vimrc".into()], vec!["~/.vimrc".into()]],
        );
        let commands = expand_invocation(&index, &inv, Method::Setup).unwrap();
        assert_eq!(
            commands,
            vec!["mkdir -p $(dirname ~/.vimrc)\nln -fs ~/dots/vimrc ~/.vimrc"]
        );
    }

    #[test]
    fn test_bt009_apt_check_loops_over_packages() {
        let index = stdlib();
        let inv = RecipeInvocation::new("apt", vec![vec!["curl".into(), "jq".into()]]);
        let commands = expand_invocation(&index, &inv, Method::IsSetup).unwrap();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("for pkg in $(echo curl jq | tr \" \" \"\\n\"); do"));
        assert!(commands[0].contains("exit 1"));
    }
}
