//! The compiled program representation.
//!
//! A [`Program`] is immutable and re-runnable: command names are already
//! bound to implementations, argument words are parsed into
//! [`ArgTemplate`]s. Templates are expanded against the session's
//! variables once per top-level statement, immediately before that
//! statement runs — which is what lets an earlier statement's `capture`
//! feed a later statement's `${...}` reference.

use std::collections::HashMap;

use crate::ast;
use crate::error::ShellError;
use crate::resolver::Binding;

/// A compiled script, ready for the interpreter.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// One compiled statement.
#[derive(Debug, Clone)]
pub enum Statement {
    /// A single bound command.
    Simple(Invocation),
    /// Concurrent stages joined by channels.
    Pipeline(Vec<Statement>),
    /// A wrapper applied to a body statement.
    Wrapper {
        invocation: Invocation,
        body: Box<Statement>,
    },
    /// A per-row binding: the inner template is compiled and run once
    /// per input record, with `var` bound to that record's text value.
    Each {
        var: String,
        template: ast::Stmt,
        line: usize,
    },
}

/// A bound command call with its argument templates.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub line: usize,
    pub binding: Binding,
    pub args: Vec<ArgTemplate>,
}

/// One argument word, split into literal runs and variable references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    segments: Vec<Segment>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `${NAME}` or `${NAME!fallback}`.
    Variable {
        name: String,
        fallback: Option<String>,
    },
}

impl ArgTemplate {
    /// Parse one argument word. `${NAME}` and `${NAME!fallback}` become
    /// variable segments; everything else stays literal. Malformed
    /// references are positioned parse errors.
    pub fn parse(word: &ast::Word) -> Result<ArgTemplate, ShellError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = word.text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(parse_reference(&mut chars, word.line)?);
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(ArgTemplate {
            segments,
            line: word.line,
        })
    }

    /// Expand against a variable map. A reference without a binding and
    /// without a fallback raises [`ShellError::UnresolvedVariable`].
    pub fn expand(&self, vars: &HashMap<String, String>) -> Result<String, ShellError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable { name, fallback } => match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => match fallback {
                        Some(fallback) => out.push_str(fallback),
                        None => return Err(ShellError::UnresolvedVariable(name.clone())),
                    },
                },
            }
        }
        Ok(out)
    }

    /// Variable names this template references (completion, diagnostics).
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// Parse the inside of `${...}`, cursor positioned after the `{`.
fn parse_reference(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> Result<Segment, ShellError> {
    let mut name = String::new();
    let mut fallback: Option<String> = None;

    loop {
        match chars.next() {
            Some('}') => break,
            Some('!') => {
                let mut text = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(ShellError::parse(line, 1, "unterminated ${...} reference"));
                }
                fallback = Some(text);
                break;
            }
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
            Some(c) => {
                return Err(ShellError::parse(
                    line,
                    1,
                    format!("invalid character '{c}' in ${{...}} reference"),
                ));
            }
            None => return Err(ShellError::parse(line, 1, "unterminated ${...} reference")),
        }
    }

    if name.is_empty() {
        return Err(ShellError::parse(line, 1, "empty ${...} reference"));
    }

    Ok(Segment::Variable { name, fallback })
}
