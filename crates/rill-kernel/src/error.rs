//! Error taxonomy for the kernel.
//!
//! Two layers: [`ShellError`] covers everything fatal before execution
//! (parse, unknown command, unresolved variable), while [`CommandError`]
//! is what a command body reports at run time. The interpreter converts
//! a `CommandError` into an error row on the shared error sink without
//! unwinding sibling stages.

use thiserror::Error;

/// Fatal, pre-execution failures. Nothing runs once one of these is
/// raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    /// Malformed syntax from the parser.
    #[error("line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A command name resolved to nothing, caught at compile time.
    #[error("line {line}: '{name}' unknown command")]
    UnknownCommand { line: usize, name: String },

    /// A block was attached to something that cannot wrap one, or a
    /// wrapper was used without its block.
    #[error("line {line}: {message}")]
    BadWrapper { line: usize, message: String },

    /// `${NAME}` with no binding and no fallback.
    #[error("cannot resolve variable: {0}")]
    UnresolvedVariable(String),
}

impl ShellError {
    /// Build a parse error.
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> ShellError {
        ShellError::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

/// A failure inside one command body. Contained to its stage: the
/// interpreter reports it on the error sink and keeps going.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Message(String),

    #[error("{command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The resolved executable could not actually be started.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation observed while the command was blocked.
    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Record(#[from] rill_types::RecordError),
}

impl CommandError {
    pub fn msg(message: impl Into<String>) -> CommandError {
        CommandError::Message(message.into())
    }
}
