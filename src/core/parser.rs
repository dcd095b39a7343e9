//! BT-004: Front end. Line-oriented, indentation-aware parser.
//!
//! Grammar (one declaration per top-level line):
//! - `recipe NAME(p1 p2):` then indented method definitions
//! - `NAME:` then indented method definitions, or `NAME: invocation(...)`
//! - `A -> B C` (A depends on B, C) and `A <- B C` (B, C depend on A)
//!
//! A method is `setup:` or `is_setup:` followed by one statement on the same
//! line, or by a block of lines indented deeper than the header. A block ends
//! at an empty line or a dedent. A statement is a recipe invocation
//! `name(a b, c)` (which may span lines until `)`) or a verbatim shell line.

use super::ast::*;
use super::error::ParseError;
use super::types::{Method, RecipeInvocation};
use tracing::debug;

/// Source front end. Stateless; build one and share it across documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a document. `source_name` is used in error locations.
    pub fn parse(&self, source_name: &str, text: &str) -> Result<SourceFile, ParseError> {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, raw)| Line::new(i + 1, raw))
            .collect();
        let mut state = ParseState {
            source_name,
            lines,
            pos: 0,
        };

        let mut items = Vec::new();
        while let Some(line) = state.next_significant() {
            if line.indent > 0 {
                return Err(state.error(
                    &line,
                    line.indent + 1,
                    "unexpected indentation at top level",
                ));
            }
            items.push(state.parse_item(&line)?);
        }

        debug!(source = source_name, items = items.len(), "parsed source");
        Ok(SourceFile { items })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Empty,
    Comment,
    Code,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    kind: LineKind,
    /// Content with surrounding whitespace removed
    text: &'a str,
}

impl<'a> Line<'a> {
    fn new(number: usize, raw: &'a str) -> Self {
        let text = raw.trim();
        let indent = raw.len() - raw.trim_start().len();
        let kind = if text.is_empty() {
            LineKind::Empty
        } else if text.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Code
        };
        Self {
            number,
            indent,
            kind,
            text,
        }
    }
}

struct ParseState<'a> {
    source_name: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> ParseState<'a> {
    fn error(&self, line: &Line, column: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.source_name, line.number, column, message)
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// Advance past empty and comment lines, returning the next code line.
    fn next_significant(&mut self) -> Option<Line<'a>> {
        self.skip_insignificant();
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    fn skip_insignificant(&mut self) {
        while let Some(line) = self.peek() {
            if line.kind == LineKind::Code {
                break;
            }
            self.pos += 1;
        }
    }

    fn parse_item(&mut self, line: &Line<'a>) -> Result<Item, ParseError> {
        let text = strip_structural_comment(line.text);

        if let Some(rest) = text.strip_prefix("recipe") {
            if rest.starts_with(char::is_whitespace) {
                return self.parse_recipe(line, text).map(Item::Recipe);
            }
        }

        let (name, rest) = split_name(line.text);
        if !name.is_empty() {
            if let Some(after_colon) = rest.trim_start().strip_prefix(':') {
                let column = line.indent + (line.text.len() - after_colon.len()) + 1;
                return self
                    .parse_target(line, name, after_colon, column)
                    .map(Item::Target);
            }
        }

        if let Some(dependency) = self.parse_dependency(line, text)? {
            return Ok(Item::Dependency(dependency));
        }

        Err(self.error(
            line,
            line.indent + 1,
            format!(
                "expected a target, recipe, or dependency declaration, found `{}`",
                line.text
            ),
        ))
    }

    /// `recipe NAME(params):` with any trailing comment already removed.
    fn parse_recipe(&mut self, line: &Line<'a>, text: &str) -> Result<RecipeNode, ParseError> {
        let header = text["recipe".len()..].trim_start();
        let name_column = line.indent + (text.len() - header.len()) + 1;
        let (name, after_name) = split_name(header);
        if name.is_empty() {
            return Err(self.error(line, name_column, "expected a recipe name after `recipe`"));
        }

        let after_name = after_name.trim_start();
        let params_text = after_name
            .strip_prefix('(')
            .and_then(|s| s.split_once(')'))
            .filter(|(_, tail)| tail.trim() == ":")
            .map(|(params, _)| params)
            .ok_or_else(|| {
                self.error(
                    line,
                    name_column + name.len(),
                    format!(
                        "malformed header for recipe '{}', expected `recipe {}(params):`",
                        name, name
                    ),
                )
            })?;

        let mut params = Vec::new();
        for param in params_text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            if !is_name(param) {
                return Err(self.error(
                    line,
                    name_column,
                    format!("invalid parameter name '{}' in recipe '{}'", param, name),
                ));
            }
            params.push(param.to_string());
        }

        let methods = self.parse_methods(line.indent)?;
        if methods.is_empty() {
            return Err(self.error(
                line,
                name_column,
                format!("recipe '{}' has no method definitions", name),
            ));
        }

        Ok(RecipeNode {
            name: name.to_string(),
            params,
            methods,
            line: line.number,
        })
    }

    fn parse_target(
        &mut self,
        line: &Line<'a>,
        name: &str,
        after_colon: &'a str,
        column: usize,
    ) -> Result<TargetNode, ParseError> {
        let shortcut = strip_trailing_comment(after_colon).trim();
        let body = if shortcut.is_empty() {
            let methods = self.parse_methods(line.indent)?;
            if methods.is_empty() {
                return Err(self.error(
                    line,
                    line.indent + 1,
                    format!("target '{}' has no method definitions", name),
                ));
            }
            TargetBody::Methods(methods)
        } else {
            match self.parse_statement(line, shortcut, column)? {
                Statement::Invocation(invocation) => TargetBody::Shortcut(invocation),
                Statement::Shell(_) => {
                    return Err(self.error(
                        line,
                        column,
                        format!(
                            "expected a recipe invocation after `{}:`, found `{}`",
                            name, shortcut
                        ),
                    ))
                }
            }
        };

        Ok(TargetNode {
            name: name.to_string(),
            body,
            line: line.number,
        })
    }

    /// `A -> B C` or `A <- B C`. Returns `None` when the line has no arrow.
    fn parse_dependency(
        &self,
        line: &Line<'a>,
        text: &str,
    ) -> Result<Option<DependencyNode>, ParseError> {
        let arrow = [("->", Direction::DependsOn), ("<-", Direction::DependedUpon)]
            .into_iter()
            .filter_map(|(token, direction)| text.find(token).map(|at| (at, token, direction)))
            .min_by_key(|(at, _, _)| *at);
        let Some((at, token, direction)) = arrow else {
            return Ok(None);
        };

        let subject = text[..at].trim();
        if !is_name(subject) {
            return Err(self.error(
                line,
                line.indent + 1,
                format!("invalid target name '{}' before `{}`", subject, token),
            ));
        }

        let mut others = Vec::new();
        for other in text[at + token.len()..].split_whitespace() {
            if !is_name(other) {
                let column = line.indent + text.find(other).unwrap_or(at) + 1;
                return Err(self.error(line, column, format!("invalid target name '{}'", other)));
            }
            others.push(other.to_string());
        }
        if others.is_empty() {
            return Err(self.error(
                line,
                line.indent + at + token.len() + 1,
                format!("expected at least one target name after `{}`", token),
            ));
        }

        Ok(Some(DependencyNode {
            subject: subject.to_string(),
            direction,
            others,
            line: line.number,
        }))
    }

    /// Method definitions indented deeper than `parent_indent`.
    fn parse_methods(&mut self, parent_indent: usize) -> Result<Vec<MethodNode>, ParseError> {
        let mut methods = Vec::new();
        loop {
            self.skip_insignificant();
            let Some(line) = self.peek() else { break };
            if line.indent <= parent_indent {
                break;
            }
            self.pos += 1;

            let (name, rest) = split_name(line.text);
            let after_colon = rest.trim_start().strip_prefix(':').filter(|_| !name.is_empty());
            let Some(after_colon) = after_colon else {
                return Err(self.error(
                    &line,
                    line.indent + 1,
                    format!("expected a method definition like `setup:`, found `{}`", line.text),
                ));
            };
            let method = Method::from_name(name).ok_or_else(|| {
                self.error(
                    &line,
                    line.indent + 1,
                    format!("unknown method '{}', expected `setup` or `is_setup`", name),
                )
            })?;

            let statement = after_colon.trim();
            let body = if statement.is_empty() || statement.starts_with('#') {
                self.parse_block(line.indent)?
            } else {
                let column = line.indent + (line.text.len() - after_colon.trim_start().len()) + 1;
                vec![self.parse_statement(&line, statement, column)?]
            };

            methods.push(MethodNode {
                method,
                body,
                line: line.number,
            });
        }
        Ok(methods)
    }

    /// Statements indented deeper than the method header.
    fn parse_block(&mut self, header_indent: usize) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        while let Some(line) = self.peek() {
            match line.kind {
                LineKind::Empty => break,
                LineKind::Comment => {
                    self.pos += 1;
                    continue;
                }
                LineKind::Code => {}
            }
            if line.indent <= header_indent {
                break;
            }
            self.pos += 1;
            body.push(self.parse_statement(&line, line.text, line.indent + 1)?);
        }
        Ok(body)
    }

    /// A recipe invocation when `text` has the `name(...)` shape, otherwise a
    /// verbatim shell line. Consumes continuation lines of an open invocation.
    fn parse_statement(
        &mut self,
        line: &Line<'a>,
        text: &str,
        column: usize,
    ) -> Result<Statement, ParseError> {
        let (name, rest) = split_name(text);
        let Some(after_open) = rest.strip_prefix('(').filter(|_| !name.is_empty()) else {
            return Ok(Statement::Shell(text.to_string()));
        };

        let mut depth = 1;
        if let Some(close) = find_closing(after_open, &mut depth) {
            let tail = strip_trailing_comment(&after_open[close + 1..]).trim();
            if !tail.is_empty() {
                return Ok(Statement::Shell(text.to_string()));
            }
            return Ok(Statement::Invocation(RecipeInvocation::new(
                name,
                parse_args(&after_open[..close]),
            )));
        }

        // Open invocation: keep reading until the closing paren.
        let mut inner = strip_trailing_comment(after_open).to_string();
        loop {
            let Some(next) = self.peek() else {
                return Err(self.error(
                    line,
                    column,
                    format!("unclosed invocation of '{}', expected `)`", name),
                ));
            };
            self.pos += 1;
            if next.kind == LineKind::Comment {
                continue;
            }
            let content = strip_trailing_comment(next.text);
            inner.push('\n');
            if let Some(close) = find_closing(content, &mut depth) {
                if !content[close + 1..].trim().is_empty() {
                    return Err(self.error(
                        &next,
                        next.indent + close + 2,
                        format!("unexpected text after `)` closing '{}'", name),
                    ));
                }
                inner.push_str(&content[..close]);
                break;
            }
            inner.push_str(content);
        }

        Ok(Statement::Invocation(RecipeInvocation::new(name, parse_args(&inner))))
    }
}

/// Split argument text into comma-separated groups of whitespace-separated
/// tokens. Blank text means zero groups.
fn parse_args(inner: &str) -> Vec<Vec<String>> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|group| group.split_whitespace().map(str::to_string).collect())
        .collect()
}

/// Byte offset of the `)` that brings `depth` to zero. Nested parens, as in
/// `$((param))`, are balanced along the way. `depth` carries across lines.
fn find_closing(s: &str, depth: &mut usize) -> Option<usize> {
    for (i, c) in s.char_indices() {
        match c {
            '(' => *depth += 1,
            ')' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// Leading run of name characters, and the remainder.
fn split_name(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_name_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Recipe headers and dependency lines hold only names and punctuation, so
/// any `#` starts a comment there.
fn strip_structural_comment(s: &str) -> &str {
    match s.find('#') {
        Some(i) => s[..i].trim_end(),
        None => s,
    }
}

/// Drop a `# ...` comment that starts the text or follows whitespace.
fn strip_trailing_comment(s: &str) -> &str {
    let mut previous_is_space = true;
    for (i, c) in s.char_indices() {
        if c == '#' && previous_is_space {
            return s[..i].trim_end();
        }
        previous_is_space = c.is_whitespace();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SourceFile {
        Parser::new().parse("test.booty", text).unwrap()
    }

    fn parse_err(text: &str) -> ParseError {
        Parser::new().parse("test.booty", text).unwrap_err()
    }

    fn inv(name: &str, args: &[&[&str]]) -> RecipeInvocation {
        RecipeInvocation::new(
            name,
            args.iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_bt004_shortcut_target() {
        let ast = parse("jq: apt(jq)\n");
        let target = ast.targets().next().unwrap();
        assert_eq!(target.name, "jq");
        assert_eq!(target.body, TargetBody::Shortcut(inv("apt", &[&["jq"]])));
    }

    #[test]
    fn test_bt004_single_line_methods() {
        let src = "pyenv:\n  setup: curl https://pyenv.run | bash\n  is_setup: which pyenv\n";
        let ast = parse(src);
        let target = ast.targets().next().unwrap();
        let TargetBody::Methods(methods) = &target.body else {
            panic!("expected methods");
        };
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].method, Method::Setup);
        assert_eq!(
            methods[0].body,
            vec![Statement::Shell("curl https://pyenv.run | bash".to_string())]
        );
        assert_eq!(methods[1].method, Method::IsSetup);
    }

    #[test]
    fn test_bt004_multi_line_block() {
        let src = r#"
rust:
    setup:
        curl -sSf https://sh.rustup.rs > /tmp/rustup.sh
        apt(build-essential)
        sh /tmp/rustup.sh -y

    is_setup: which cargo
"#;
        let ast = parse(src);
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert_eq!(methods[0].body.len(), 3);
        assert_eq!(
            methods[0].body[1],
            Statement::Invocation(inv("apt", &[&["build-essential"]]))
        );
        assert_eq!(methods[1].body, vec![Statement::Shell("which cargo".to_string())]);
    }

    #[test]
    fn test_bt004_block_ends_at_dedent() {
        let src = "x:\n  setup:\n    a\n    b\n  is_setup:\n    c\n";
        let ast = parse(src);
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert_eq!(methods[0].body.len(), 2);
        assert_eq!(methods[1].body, vec![Statement::Shell("c".to_string())]);
    }

    #[test]
    fn test_bt004_multi_line_invocation() {
        let src = r#"
deps:
    setup:
        apt(build-essential libssl-dev
            zlib1g-dev libffi-dev)
        echo done
    is_setup: true
"#;
        let ast = parse(src);
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert_eq!(
            methods[0].body[0],
            Statement::Invocation(inv(
                "apt",
                &[&["build-essential", "libssl-dev", "zlib1g-dev", "libffi-dev"]]
            ))
        );
        assert_eq!(methods[0].body[1], Statement::Shell("echo done".to_string()));
    }

    #[test]
    fn test_bt004_recipe_definition() {
        let src = "recipe git(repo, dist):\n    setup: git clone $((repo)) $((dist))\n    is_setup: test -d $((dist))\n";
        let ast = parse(src);
        let recipe = ast.recipes().next().unwrap();
        assert_eq!(recipe.name, "git");
        assert_eq!(recipe.params, vec!["repo", "dist"]);
        assert_eq!(recipe.methods.len(), 2);
    }

    #[test]
    fn test_bt004_recipe_params_space_separated() {
        let ast = parse("recipe ln(src dst):\n  setup: ln -s $((src)) $((dst))\n");
        assert_eq!(ast.recipes().next().unwrap().params, vec!["src", "dst"]);
    }

    #[test]
    fn test_bt004_invocation_groups() {
        let ast = parse("repo: git(https://x.git, ~/src/x)\n");
        let target = ast.targets().next().unwrap();
        assert_eq!(
            target.body,
            TargetBody::Shortcut(inv("git", &[&["https://x.git"], &["~/src/x"]]))
        );
    }

    #[test]
    fn test_bt004_empty_invocation_has_no_groups() {
        let ast = parse("x: noop()\n");
        assert_eq!(
            ast.targets().next().unwrap().body,
            TargetBody::Shortcut(inv("noop", &[]))
        );
    }

    #[test]
    fn test_bt004_invocation_forwards_parameter() {
        let src = "recipe wrap(dir):\n  setup: git(https://x.git, $((dir)))\n  is_setup: test -d $((dir))\n";
        let ast = parse(src);
        let recipe = ast.recipes().next().unwrap();
        assert_eq!(
            recipe.methods[0].body,
            vec![Statement::Invocation(inv("git", &[&["https://x.git"], &["$((dir))"]]))]
        );
    }

    #[test]
    fn test_bt004_dependencies_both_directions() {
        let ast = parse("pyenv -> pipx curl\npyenv <- python3.10 python3.11\n");
        let deps: Vec<_> = ast.dependencies().collect();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].subject, "pyenv");
        assert_eq!(deps[0].direction, Direction::DependsOn);
        assert_eq!(deps[0].others, vec!["pipx", "curl"]);
        assert_eq!(deps[1].direction, Direction::DependedUpon);
        assert_eq!(deps[1].others, vec!["python3.10", "python3.11"]);
    }

    #[test]
    fn test_bt004_dependency_without_spaces() {
        let ast = parse("my-tool->base\n");
        let dep = ast.dependencies().next().unwrap();
        assert_eq!(dep.subject, "my-tool");
        assert_eq!(dep.others, vec!["base"]);
    }

    #[test]
    fn test_bt004_comments_stripped() {
        let src = "# header comment\njq: apt(jq) # trailing\n\n# another\na -> b # why\n";
        let ast = parse(src);
        assert_eq!(ast.items.len(), 2);
        assert_eq!(
            ast.targets().next().unwrap().body,
            TargetBody::Shortcut(inv("apt", &[&["jq"]]))
        );
        assert_eq!(ast.dependencies().next().unwrap().others, vec!["b"]);
    }

    #[test]
    fn test_bt004_comment_glued_to_dependency_name() {
        let ast = parse("a: apt(a)\nb: apt(b)\na -> b#needs b first\nb <- c#and c\n");
        let deps: Vec<_> = ast.dependencies().collect();
        assert_eq!(deps[0].others, vec!["b"]);
        assert_eq!(deps[1].others, vec!["c"]);
    }

    #[test]
    fn test_bt004_comment_glued_to_recipe_header() {
        let ast = parse("recipe r(a):#helper\n  setup: echo $((a))\n  is_setup: true\n");
        assert_eq!(ast.recipes().next().unwrap().params, vec!["a"]);
    }

    #[test]
    fn test_bt004_comments_after_headers() {
        let src = "recipe r(a): # helper\n  setup: echo $((a))\n\nx: # tool\n  setup: # build it\n    make\n  is_setup: true\n";
        let ast = parse(src);
        assert_eq!(ast.recipes().next().unwrap().params, vec!["a"]);
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert_eq!(methods[0].body, vec![Statement::Shell("make".to_string())]);
    }

    #[test]
    fn test_bt004_shell_line_keeps_hash() {
        let ast = parse("x:\n  setup: echo \"#1\" # not stripped\n  is_setup: true\n");
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert_eq!(
            methods[0].body,
            vec![Statement::Shell("echo \"#1\" # not stripped".to_string())]
        );
    }

    #[test]
    fn test_bt004_shell_with_parens_is_not_invocation() {
        let src = "x:\n  setup:\n    mkdir -p $(dirname /a/b)\n    fn() { true; }\n  is_setup: true\n";
        let ast = parse(src);
        let TargetBody::Methods(methods) = &ast.targets().next().unwrap().body else {
            panic!("expected methods");
        };
        assert!(methods[0]
            .body
            .iter()
            .all(|s| matches!(s, Statement::Shell(_))));
    }

    #[test]
    fn test_bt004_unknown_method_is_error() {
        let err = parse_err("x:\n  install: make\n");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        assert!(err.message.contains("unknown method 'install'"));
    }

    #[test]
    fn test_bt004_shortcut_must_be_invocation() {
        let err = parse_err("x: echo hi\n");
        assert_eq!(err.line, 1);
        assert!(err.message.contains("expected a recipe invocation"));
    }

    #[test]
    fn test_bt004_unclosed_invocation() {
        let err = parse_err("x: apt(curl\n  wget\n");
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unclosed invocation"));
    }

    #[test]
    fn test_bt004_garbage_top_level() {
        let err = parse_err("jq: apt(jq)\n!!!\n");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_bt004_unexpected_indentation() {
        let err = parse_err("   a -> b\n");
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 4);
    }

    #[test]
    fn test_bt004_target_without_methods() {
        let err = parse_err("x:\n\ny: apt(y)\n");
        assert!(err.message.contains("no method definitions"));
    }

    #[test]
    fn test_bt004_malformed_recipe_header() {
        let err = parse_err("recipe broken(a b\n  setup: x\n");
        assert!(err.message.contains("malformed header"));
    }

    #[test]
    fn test_bt004_dependency_needs_names() {
        let err = parse_err("a ->\n");
        assert!(err.message.contains("at least one target name"));
    }

    #[test]
    fn test_bt004_empty_source() {
        assert!(parse("").items.is_empty());
        assert!(parse("\n# only comments\n\n").items.is_empty());
    }
}
