//! Program execution.
//!
//! Top-level statements run strictly sequentially on the calling task;
//! the stages of one pipeline run as concurrent tokio tasks joined by
//! bounded channels — the only point of real parallelism. Every stage
//! contains its own failures: a `CommandError` becomes one error row on
//! the shared error sink and an error status, siblings keep running,
//! and downstream just sees EOF sooner.
//!
//! Argument templates are expanded here, once per top-level statement
//! immediately before it runs, against the variables at that moment.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use rill_types::{ExitStatus, Record, Style, Value};

use crate::ast;
use crate::channel::{channel, InChannel, Interrupt, OutChannel, CHANNEL_CAPACITY};
use crate::commands::{external, ExecContext};
use crate::compiler::Compiler;
use crate::error::{CommandError, ShellError};
use crate::program::{Invocation, Program, Statement};
use crate::resolver::{Binding, Resolver};
use crate::state::{lock, SharedState};

/// Executes compiled programs against a shared session state.
pub struct Interpreter {
    state: SharedState,
    interrupt: Interrupt,
}

impl Interpreter {
    pub fn new(state: SharedState, interrupt: Interrupt) -> Interpreter {
        Interpreter { state, interrupt }
    }

    /// Run a program. The result is the status of the last statement
    /// executed; `exit` stops the sequence early with its own status;
    /// an interrupt forces a nonzero status.
    pub async fn eval(&self, program: &Program, out: OutChannel, err: OutChannel) -> ExitStatus {
        let ctx = ExecContext::new(self.state.clone(), self.interrupt.clone());
        let mut status = ExitStatus::SUCCESS;

        for statement in &program.statements {
            if self.interrupt.is_raised() {
                return ExitStatus::ERROR;
            }

            // Bind ${...} references now, against the variables as they
            // are after the previous statement finished.
            let vars = lock(&self.state).variables.clone();
            let bound = match bind(statement, &vars) {
                Ok(bound) => bound,
                Err(error) => {
                    report(&err, &error.to_string()).await;
                    return ExitStatus::ERROR;
                }
            };

            status = run_unit(
                ctx.clone(),
                bound,
                InChannel::empty(self.interrupt.clone()),
                out.clone(),
                err.clone(),
            )
            .await;

            if lock(&self.state).exit_requested {
                debug!(status = status.value(), "exit requested, stopping sequence");
                return status;
            }
        }

        if self.interrupt.is_raised() {
            return ExitStatus::ERROR;
        }
        status
    }
}

// ── bound statements ──
//
// The compiled Program keeps argument templates; a Bound tree is the
// same shape with every template expanded to a concrete string. Binding
// happens per top-level statement, so a whole statement sees one
// consistent variable snapshot — pipelines and wrapper bodies included.

#[derive(Debug, Clone)]
enum Bound {
    Simple(BoundCall),
    Pipeline(Vec<Bound>),
    Wrapper { call: BoundCall, body: Box<Bound> },
    Each { var: String, template: ast::Stmt },
}

#[derive(Debug, Clone)]
struct BoundCall {
    name: String,
    binding: Binding,
    args: Vec<String>,
}

fn bind(statement: &Statement, vars: &HashMap<String, String>) -> Result<Bound, ShellError> {
    match statement {
        Statement::Simple(invocation) => Ok(Bound::Simple(bind_call(invocation, vars)?)),
        Statement::Pipeline(stages) => {
            let bound = stages
                .iter()
                .map(|stage| bind(stage, vars))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Bound::Pipeline(bound))
        }
        Statement::Wrapper { invocation, body } => Ok(Bound::Wrapper {
            call: bind_call(invocation, vars)?,
            body: Box::new(bind(body, vars)?),
        }),
        Statement::Each { var, template, .. } => Ok(Bound::Each {
            var: var.clone(),
            template: template.clone(),
        }),
    }
}

fn bind_call(invocation: &Invocation, vars: &HashMap<String, String>) -> Result<BoundCall, ShellError> {
    let args = invocation
        .args
        .iter()
        .map(|template| template.expand(vars))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BoundCall {
        name: invocation.name.clone(),
        binding: invocation.binding.clone(),
        args,
    })
}

// ── execution ──

/// Run one bound statement to completion. This is the body of every
/// pipeline stage worker as well as the top-level path, so it owns its
/// inputs and reports its own failures.
fn run_unit(
    ctx: ExecContext,
    statement: Bound,
    input: InChannel,
    out: OutChannel,
    err: OutChannel,
) -> Pin<Box<dyn Future<Output = ExitStatus> + Send>> {
    Box::pin(async move {
        match statement {
            Bound::Pipeline(stages) => run_pipeline(ctx, stages, input, out, err).await,
            Bound::Simple(call) => {
                let result = run_call(&ctx, &call, input, out, err.clone()).await;
                settle(result, &err).await
            }
            Bound::Wrapper { call, body } => {
                let result = run_wrapper(&ctx, &call, *body, input, out, err.clone()).await;
                settle(result, &err).await
            }
            Bound::Each { var, template } => {
                let result = run_each(&ctx, &var, &template, input, out, err.clone()).await;
                settle(result, &err).await
            }
        }
    })
}

/// Fold a command result into a status, reporting failures on the
/// error sink. Interrupts report no row — the nonzero status is the
/// whole story.
async fn settle(result: Result<ExitStatus, CommandError>, err: &OutChannel) -> ExitStatus {
    match result {
        Ok(status) => status,
        Err(CommandError::Interrupted) => ExitStatus::ERROR,
        Err(error) => {
            report(err, &error.to_string()).await;
            ExitStatus::ERROR
        }
    }
}

/// Emit one `{error: ...}` row on the error sink.
async fn report(err: &OutChannel, message: &str) {
    let message = if message.trim().is_empty() {
        "(no message)"
    } else {
        message
    };
    if let Ok(record) = Record::single(
        "error",
        Value::Text(message.to_string()).styled(Style::Error),
    ) {
        let _ = err.send(record).await;
    }
}

async fn run_pipeline(
    ctx: ExecContext,
    stages: Vec<Bound>,
    input: InChannel,
    out: OutChannel,
    err: OutChannel,
) -> ExitStatus {
    if stages.is_empty() {
        return ExitStatus::SUCCESS;
    }

    let last_index = stages.len() - 1;
    let mut upstream = Some(input);
    let mut workers = Vec::with_capacity(stages.len());

    for (index, stage) in stages.into_iter().enumerate() {
        let stage_in = upstream
            .take()
            .unwrap_or_else(|| InChannel::empty(ctx.interrupt.clone()));
        let stage_out = if index == last_index {
            out.clone()
        } else {
            let (tx, rx) = channel(CHANNEL_CAPACITY, ctx.interrupt.clone());
            upstream = Some(rx);
            tx
        };
        // Each stage worker owns its channel ends; dropping them on any
        // exit path (including panic unwind) is what closes the stage's
        // output so downstream sees EOF.
        workers.push(tokio::spawn(run_unit(
            ctx.clone(),
            stage,
            stage_in,
            stage_out,
            err.clone(),
        )));
    }

    let mut last_status = ExitStatus::SUCCESS;
    let mut any_failed = false;
    for (index, worker) in workers.into_iter().enumerate() {
        let status = match worker.await {
            Ok(status) => status,
            Err(join_error) => {
                report(&err, &format!("pipeline stage panicked: {join_error}")).await;
                ExitStatus::ERROR
            }
        };
        if status.is_error() {
            any_failed = true;
        }
        if index == last_index {
            last_status = status;
        }
    }

    // The pipeline's status is the last stage's status, overridden to
    // error when any stage failed.
    if any_failed && last_status.is_success() {
        ExitStatus::ERROR
    } else {
        last_status
    }
}

async fn run_call(
    ctx: &ExecContext,
    call: &BoundCall,
    input: InChannel,
    out: OutChannel,
    err: OutChannel,
) -> Result<ExitStatus, CommandError> {
    match &call.binding {
        Binding::Command(command) => command.run(&call.args, input, out, err, ctx).await,
        Binding::External(path) => external::run(path, &call.name, &call.args, input, out, ctx).await,
        Binding::Wrapper(_) => Err(CommandError::msg(format!(
            "'{}' needs a {{ body }} block",
            call.name
        ))),
    }
}

async fn run_wrapper(
    ctx: &ExecContext,
    call: &BoundCall,
    body: Bound,
    input: InChannel,
    out: OutChannel,
    err: OutChannel,
) -> Result<ExitStatus, CommandError> {
    let wrapper = match &call.binding {
        Binding::Wrapper(wrapper) => wrapper.clone(),
        _ => {
            return Err(CommandError::msg(format!(
                "'{}' cannot wrap a {{ body }} block",
                call.name
            )))
        }
    };

    // The wrapper's own input feeds the first body run; retry cycles
    // cannot replay a consumed stream and start at EOF.
    let mut body_input = Some(input);

    loop {
        let mut resource = wrapper.before(&call.args, ctx).await?;
        let body_out = wrapper.body_output(&mut resource, &out);
        let stage_in = body_input
            .take()
            .unwrap_or_else(|| InChannel::empty(ctx.interrupt.clone()));

        let body_status = run_unit(ctx.clone(), body.clone(), stage_in, body_out, err.clone()).await;

        // `after` is the release path; it runs even when the body was
        // interrupted partway through.
        let status = wrapper
            .after(&mut resource, body_status, &out, &err, ctx)
            .await?;

        if ctx.interrupt.is_raised() {
            return Ok(ExitStatus::ERROR);
        }
        if !wrapper.retry(&resource) {
            return Ok(status);
        }
    }
}

async fn run_each(
    ctx: &ExecContext,
    var: &str,
    template: &ast::Stmt,
    mut input: InChannel,
    out: OutChannel,
    err: OutChannel,
) -> Result<ExitStatus, CommandError> {
    let mut status = ExitStatus::SUCCESS;

    while let Some(record) = input
        .recv()
        .await
        .map_err(|_| CommandError::Interrupted)?
    {
        let value = record
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| record.to_line());

        // Bind into a copy scoped to this single run: the binding never
        // leaks to sibling rows or to the session itself.
        let (resolver, mut vars) = {
            let state = lock(&ctx.state);
            (Resolver::from_state(&state), state.variables.clone())
        };
        vars.insert(var.to_string(), value);

        let compiled = Compiler::from_resolver(resolver)
            .compile_statement(template)
            .and_then(|statement| bind(&statement, &vars))
            .map_err(|error| CommandError::msg(error.to_string()))?;

        status = run_unit(
            ctx.clone(),
            compiled,
            InChannel::empty(ctx.interrupt.clone()),
            out.clone(),
            err.clone(),
        )
        .await;
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    /// Compile and run a script against a bare session, collecting the
    /// rows produced on both sinks.
    async fn run(state: SharedState, source: &str) -> (ExitStatus, Vec<Record>, Vec<Record>) {
        let interrupt = Interrupt::new();
        let program = {
            let guard = lock(&state);
            Compiler::new(&guard).compile(source).expect("compile failed")
        };

        let (out_tx, mut out_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());
        let (err_tx, mut err_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());
        let collector = tokio::spawn(async move {
            let mut rows = Vec::new();
            while let Ok(Some(record)) = out_rx.recv().await {
                rows.push(record);
            }
            rows
        });
        let err_collector = tokio::spawn(async move {
            let mut rows = Vec::new();
            while let Ok(Some(record)) = err_rx.recv().await {
                rows.push(record);
            }
            rows
        });

        let interpreter = Interpreter::new(state, interrupt);
        let status = interpreter.eval(&program, out_tx, err_tx).await;
        // Dropping the channel ends closed the sinks; collectors drain.
        let rows = collector.await.unwrap();
        let errors = err_collector.await.unwrap();
        (status, rows, errors)
    }

    fn texts(rows: &[Record]) -> Vec<String> {
        rows.iter().map(Record::to_line).collect()
    }

    #[tokio::test]
    async fn echo_emits_one_row() {
        let (status, rows, errors) = run(State::bare().shared(), "echo hello world").await;
        assert!(status.is_success());
        assert_eq!(texts(&rows), vec!["hello world"]);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn sequence_runs_in_order() {
        let (status, rows, _) = run(State::bare().shared(), "echo a ; echo b").await;
        assert!(status.is_success());
        assert_eq!(texts(&rows), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn exit_stops_the_sequence() {
        let (status, rows, _) = run(State::bare().shared(), "echo a ; exit 42 ; echo b").await;
        assert_eq!(status.value(), 42);
        assert_eq!(texts(&rows), vec!["a"]);
    }

    #[tokio::test]
    async fn pipeline_status_is_last_stage() {
        let (status, rows, _) = run(State::bare().shared(), "rand | take 100 | count").await;
        assert!(status.is_success());
        assert_eq!(texts(&rows), vec!["100"]);
    }

    #[tokio::test]
    async fn failed_stage_fails_the_pipeline() {
        let (status, _, errors) = run(State::bare().shared(), "fail oops | count").await;
        assert!(status.is_error());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_line().contains("oops"));
    }

    #[tokio::test]
    async fn both_stages_report_errors() {
        let (status, _, errors) = run(State::bare().shared(), "fail one | fail two").await;
        assert!(status.is_error());
        let messages = texts(&errors).join("\n");
        assert!(messages.contains("one"));
        assert!(messages.contains("two"));
    }

    #[tokio::test]
    async fn unresolved_variable_aborts_with_error() {
        let (status, rows, errors) = run(State::bare().shared(), "echo ${MISSING}").await;
        assert!(status.is_error());
        assert!(rows.is_empty());
        assert_eq!(texts(&errors), vec!["cannot resolve variable: MISSING"]);
    }

    #[tokio::test]
    async fn capture_feeds_the_next_statement() {
        let source = "echo 'world' | capture WHO ; echo hello ${WHO}";
        let (status, rows, _) = run(State::bare().shared(), source).await;
        assert!(status.is_success());
        assert_eq!(texts(&rows), vec!["hello world"]);
    }

    #[tokio::test]
    async fn each_binding_does_not_leak() {
        let state = State::bare().shared();
        let source = "echo a ; echo b";
        let _ = run(state.clone(), source).await;

        let (status, rows, _) =
            run(state.clone(), "echo x | { item -> echo got ${item} }").await;
        assert!(status.is_success());
        assert_eq!(texts(&rows), vec!["got x"]);
        // The per-row binding never reaches the session state.
        assert!(!lock(&state).variables.contains_key("item"));
    }

    #[tokio::test]
    async fn interrupt_forces_error_status() {
        let state = State::bare().shared();
        let interrupt = Interrupt::new();
        let program = {
            let guard = lock(&state);
            Compiler::new(&guard).compile("rand | count").unwrap()
        };

        let out = OutChannel::null(interrupt.clone());
        let err = OutChannel::null(interrupt.clone());
        let interpreter = Interpreter::new(state, interrupt.clone());

        let raiser = tokio::spawn({
            let interrupt = interrupt.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                interrupt.raise();
            }
        });

        let status = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            interpreter.eval(&program, out, err),
        )
        .await
        .expect("interrupted pipeline hung");
        assert!(status.is_error());
        raiser.await.unwrap();
    }
}
