//! Syntax tree produced by the parser and consumed by the compiler.
//!
//! Positions are 1-based source lines, kept on every name and argument
//! token so compile-time diagnostics can point at the offending word.

/// A parsed script: one or more statements separated by `;` or newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub statements: Vec<Stmt>,
}

/// One statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// A plain command call.
    Call(Call),
    /// Two or more stages joined by `|`.
    Pipeline(Vec<Stmt>),
    /// A command applied to a braced body: `benchmark 3 { echo hi }`.
    Wrapped { call: Call, body: Box<Stmt> },
    /// A per-row binding: `{ x -> echo ${x} }`.
    Lambda {
        var: String,
        body: Box<Stmt>,
        line: usize,
    },
}

/// A command name with its raw argument words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub line: usize,
    pub args: Vec<Word>,
}

/// One argument token, quotes already stripped. `${...}` references are
/// still literal text here; the compiler parses them into templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub line: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, line: usize) -> Word {
        Word {
            text: text.into(),
            line,
        }
    }
}
