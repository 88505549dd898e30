//! Syntax tree → [`Program`] translation.
//!
//! The compiler walks the parsed script depth-first, resolving every
//! command name against a snapshot of the session's command table and
//! PATH, and parsing every argument word into a template. Name
//! resolution is all-or-nothing: one unknown command anywhere in a
//! multi-statement script aborts the whole compile, so nothing executes.
//!
//! Variable *expansion* is deliberately not done here — templates are
//! expanded per top-level statement just before it runs (see
//! [`crate::interpreter`]), uniformly for pipelines and wrapper bodies.

use crate::ast::{Call, Script, Stmt};
use crate::error::ShellError;
use crate::parser;
use crate::program::{ArgTemplate, Invocation, Program, Statement};
use crate::resolver::{Binding, Resolver};
use crate::state::State;

/// Compiles source text against a resolver snapshot.
#[derive(Debug, Clone)]
pub struct Compiler {
    resolver: Resolver,
}

impl Compiler {
    pub fn new(state: &State) -> Compiler {
        Compiler {
            resolver: Resolver::from_state(state),
        }
    }

    pub fn from_resolver(resolver: Resolver) -> Compiler {
        Compiler { resolver }
    }

    /// Compile a whole script. Parse errors and unknown commands abort
    /// with no partial program.
    pub fn compile(&self, source: &str) -> Result<Program, ShellError> {
        let script = parser::parse(source)?;
        self.compile_script(&script)
    }

    pub fn compile_script(&self, script: &Script) -> Result<Program, ShellError> {
        let statements = script
            .statements
            .iter()
            .map(|stmt| self.compile_statement(stmt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Program { statements })
    }

    /// Compile one statement subtree.
    pub fn compile_statement(&self, stmt: &Stmt) -> Result<Statement, ShellError> {
        match stmt {
            Stmt::Call(call) => Ok(Statement::Simple(self.bind_call(call, false)?)),
            Stmt::Pipeline(stages) => {
                let compiled = stages
                    .iter()
                    .map(|stage| self.compile_statement(stage))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Statement::Pipeline(compiled))
            }
            Stmt::Wrapped { call, body } => {
                let invocation = self.bind_call(call, true)?;
                let body = Box::new(self.compile_statement(body)?);
                Ok(Statement::Wrapper { invocation, body })
            }
            Stmt::Lambda { var, body, line } => {
                // The template is recompiled per input row, but unknown
                // commands inside it must surface now, before anything
                // executes.
                self.compile_statement(body)?;
                Ok(Statement::Each {
                    var: var.clone(),
                    template: (**body).clone(),
                    line: *line,
                })
            }
        }
    }

    fn bind_call(&self, call: &Call, wraps_block: bool) -> Result<Invocation, ShellError> {
        let binding = self
            .resolver
            .resolve(&call.name)
            .ok_or_else(|| ShellError::UnknownCommand {
                line: call.line,
                name: call.name.clone(),
            })?;

        match (&binding, wraps_block) {
            (Binding::Wrapper(_), false) => {
                return Err(ShellError::BadWrapper {
                    line: call.line,
                    message: format!("'{}' needs a {{ body }} block", call.name),
                });
            }
            (Binding::Command(_) | Binding::External(_), true) => {
                return Err(ShellError::BadWrapper {
                    line: call.line,
                    message: format!("'{}' cannot wrap a {{ body }} block", call.name),
                });
            }
            _ => {}
        }

        let args = call
            .args
            .iter()
            .map(ArgTemplate::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Invocation {
            name: call.name.clone(),
            line: call.line,
            binding,
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> Compiler {
        Compiler::new(&State::bare())
    }

    #[test]
    fn valid_script_compiles() {
        let program = compiler().compile("echo a ; rand | take 3 | count").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0], Statement::Simple(_)));
        match &program.statements[1] {
            Statement::Pipeline(stages) => assert_eq!(stages.len(), 3),
            other => panic!("expected a pipeline, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_carries_line() {
        let err = compiler().compile("echo ok\nnope arg").unwrap_err();
        assert_eq!(err.to_string(), "line 2: 'nope' unknown command");
    }

    #[test]
    fn unknown_command_anywhere_aborts_everything() {
        // The bad name is in the last statement; the compile as a whole
        // must still fail, so no earlier statement runs.
        let err = compiler().compile("echo a ; echo b ; zzz").unwrap_err();
        assert!(matches!(err, ShellError::UnknownCommand { line: 1, .. }));
    }

    #[test]
    fn unknown_command_inside_pipeline() {
        let err = compiler().compile("rand | mystery | count").unwrap_err();
        assert_eq!(err.to_string(), "line 1: 'mystery' unknown command");
    }

    #[test]
    fn unknown_command_inside_lambda_template() {
        let err = compiler().compile("rand | { x -> mystery ${x} }").unwrap_err();
        assert!(matches!(err, ShellError::UnknownCommand { .. }));
    }

    #[test]
    fn wrapper_requires_block() {
        let err = compiler().compile("benchmark 3").unwrap_err();
        assert!(matches!(err, ShellError::BadWrapper { .. }));
    }

    #[test]
    fn plain_command_rejects_block() {
        let err = compiler().compile("echo { count }").unwrap_err();
        assert!(matches!(err, ShellError::BadWrapper { .. }));
    }

    #[test]
    fn wrapper_with_block_compiles() {
        let program = compiler().compile("time { echo hi }").unwrap();
        assert!(matches!(program.statements[0], Statement::Wrapper { .. }));
    }

    #[test]
    fn bad_variable_syntax_is_fatal() {
        assert!(matches!(
            compiler().compile("echo ${"),
            Err(ShellError::Parse { .. })
        ));
    }
}
