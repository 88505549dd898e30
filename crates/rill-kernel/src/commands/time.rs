//! time — measure wall-clock around one body run.
//!
//! The body's rows pass straight through; one `{elapsed: ...}` row
//! follows them.

use std::time::Instant;

use async_trait::async_trait;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{OutChannel, SendError};
use crate::error::CommandError;

use super::command::{ExecContext, Wrapper, WrapperResource};

pub struct Time;

struct Stopwatch {
    started: Instant,
}

#[async_trait]
impl Wrapper for Time {
    fn name(&self) -> &str {
        "time"
    }

    async fn before(
        &self,
        args: &[String],
        _ctx: &ExecContext,
    ) -> Result<WrapperResource, CommandError> {
        if !args.is_empty() {
            return Err(CommandError::msg("time: takes no arguments"));
        }
        Ok(Box::new(Stopwatch {
            started: Instant::now(),
        }))
    }

    async fn after(
        &self,
        resource: &mut WrapperResource,
        body_status: ExitStatus,
        output: &OutChannel,
        _errors: &OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let stopwatch = resource
            .downcast_ref::<Stopwatch>()
            .ok_or_else(|| CommandError::msg("time: stopwatch resource missing"))?;
        let elapsed = stopwatch.started.elapsed();

        let record = Record::single("elapsed", Value::Duration(elapsed))?;
        match output.send(record).await {
            Ok(()) | Err(SendError::Closed) => Ok(body_status),
            Err(SendError::Interrupted) => Err(CommandError::Interrupted),
        }
    }
}
