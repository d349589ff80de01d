//! The embedded scripting language used by `variable`, `filename` and `skipif` tags.
//!
//! Bodies are written in a small Python-like language. An inline body is a single
//! expression whose value is the result. A block body is a sequence of statements
//! whose `return` value is the result. Context variables are reachable through the
//! read-only `vars` dictionary.

pub mod ast;
mod builtins;
mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

use std::fmt;

pub use value::Value;

/// Failure while parsing or running a tag body.
///
/// `line` is relative to the body: 0 for an inline body, 1-based for a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub line: usize,
    pub msg: String,
}

impl EvalError {
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Self { line, msg: format!("syntax error: {}", msg.into()) }
    }

    pub fn runtime(line: usize, msg: impl Into<String>) -> Self {
        Self { line, msg: msg.into() }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.msg)
    }
}

impl std::error::Error for EvalError {}

/// How a tag body was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// `<< expression >>` on the tag line.
    Inline,
    /// Statements on the lines between `<<` and `>>`.
    Block,
}

/// Parses and evaluates a tag body against the `vars` snapshot.
///
/// # Arguments
/// * `source` - Body text as written between the delimiters
/// * `mode` - Whether the body is an inline expression or a statement block
/// * `vars` - Dictionary exposed to the body as `vars`
///
/// # Returns
/// * `Result<Value, EvalError>` - The body's value, with errors carrying body-relative lines
pub fn execute(source: &str, mode: BodyMode, vars: &Value) -> Result<Value, EvalError> {
    match mode {
        BodyMode::Inline => parser::parse_inline(source.trim())
            .and_then(|program| eval::Interpreter::new(vars).run(&program))
            // Inline bodies have no line structure of their own.
            .map_err(|e| EvalError { line: 0, ..e }),
        BodyMode::Block => parser::parse_program(&dedent(source))
            .and_then(|program| eval::Interpreter::new(vars).run(&program)),
    }
}

/// Removes the indentation common to all non-blank lines, keeping the line count.
pub fn dedent(source: &str) -> String {
    let indent = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    source
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[indent.min(line.len())..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedent_keeps_line_count() {
        let source = "\n    x = 1\n\n    return x\n";
        let dedented = dedent(source);
        assert_eq!(dedented, "\nx = 1\n\nreturn x");
        assert_eq!(dedented.lines().count(), source.lines().count());
    }

    #[test]
    fn test_inline_errors_report_line_zero() {
        let vars = Value::Dict(Default::default());
        let err = execute("1 +", BodyMode::Inline, &vars).unwrap_err();
        assert_eq!(err.line, 0);
        assert!(err.msg.starts_with("syntax error"));
    }
}
