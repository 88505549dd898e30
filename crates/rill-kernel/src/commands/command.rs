//! Core command traits and the execution context.
//!
//! Every builtin implements [`Command`]; resource-scoping commands like
//! `benchmark` and `time` implement [`Wrapper`] instead. Both are
//! resolved to concrete instances at compile time and driven by the
//! interpreter — commands never spawn their own stages.

use std::any::Any;

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, Interrupt, OutChannel};
use crate::error::CommandError;
use crate::state::SharedState;

/// Execution context handed to every command invocation.
///
/// Cheap to clone; one per pipeline stage. All session access goes
/// through the shared state's lock.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub state: SharedState,
    pub interrupt: Interrupt,
}

impl ExecContext {
    pub fn new(state: SharedState, interrupt: Interrupt) -> ExecContext {
        ExecContext { state, interrupt }
    }
}

/// A runnable command.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's name (used for lookup and diagnostics).
    fn name(&self) -> &str;

    /// Run to completion: consume `input`, produce rows on `output`,
    /// report anomalies on `errors`. Returning `Err` marks the stage as
    /// failed; the interpreter converts it into an error row without
    /// disturbing sibling stages.
    async fn run(
        &self,
        args: &[String],
        input: InChannel,
        output: OutChannel,
        errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError>;
}

/// Per-cycle resource acquired by a wrapper's `before` hook.
pub type WrapperResource = Box<dyn Any + Send>;

/// A command that scopes a resource around an inner statement.
///
/// The interpreter drives the cycle: `before` acquires, the body runs
/// with its output routed through `body_output`, `after` emits summary
/// rows and releases, and `retry` decides whether the whole cycle runs
/// again. `after` always runs, interrupt included — it is the release
/// path.
#[async_trait]
pub trait Wrapper: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire the resource for one body run.
    async fn before(
        &self,
        args: &[String],
        ctx: &ExecContext,
    ) -> Result<WrapperResource, CommandError>;

    /// Where the body's rows go this cycle. Defaults to passthrough.
    fn body_output(&self, resource: &mut WrapperResource, out: &OutChannel) -> OutChannel {
        let _ = resource;
        out.clone()
    }

    /// Emit summary rows and release the cycle's resource. Returns the
    /// wrapper's status for this cycle.
    async fn after(
        &self,
        resource: &mut WrapperResource,
        body_status: ExitStatus,
        output: &OutChannel,
        errors: &OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError>;

    /// Whether to run another before/body/after cycle. Default: never.
    fn retry(&self, resource: &WrapperResource) -> bool {
        let _ = resource;
        false
    }
}
