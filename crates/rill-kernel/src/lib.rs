//! rill-kernel: the compiler and execution engine of the rill shell.
//!
//! Source text flows through the stages below; everything upstream of
//! the compiler is plain data, everything downstream is concurrent.
//!
//! ```text
//! text ──▶ lexer/parser ──▶ ast::Script
//!                              │
//!                              ▼
//!                   Compiler (resolve names, build arg templates)
//!                              │
//!                              ▼ Program
//!                   Interpreter ──▶ channels ──▶ out / err sinks
//!                       │
//!                       ├── builtins (commands::*)
//!                       └── external processes (tokio::process)
//! ```
//!
//! The [`Session`] facade ties a shared [`State`] to compile+eval runs
//! and is what embedders (the REPL binary, tests) talk to.

pub mod ast;
pub mod channel;
pub mod commands;
pub mod compiler;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod resolver;
pub mod session;
pub mod state;

pub use channel::{channel, InChannel, Interrupt, OutChannel, CHANNEL_CAPACITY};
pub use error::{CommandError, ShellError};
pub use interpreter::Interpreter;
pub use program::{Program, Statement};
pub use session::Session;
pub use state::{SharedState, State};
