//! take — forward the first N rows, then stop.
//!
//! Dropping the input early is the point: a blocked upstream producer
//! gets a closed-channel outcome on its next send and winds down.

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel, SendError};
use crate::error::CommandError;

use super::command::{Command, ExecContext};

pub struct Take;

#[async_trait]
impl Command for Take {
    fn name(&self) -> &str {
        "take"
    }

    async fn run(
        &self,
        args: &[String],
        mut input: InChannel,
        output: OutChannel,
        _errors: OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let limit = match args.first() {
            Some(arg) => arg
                .parse::<u64>()
                .map_err(|_| CommandError::msg(format!("take: invalid count '{arg}'")))?,
            None => return Err(CommandError::msg("take: usage: take N")),
        };

        let mut forwarded = 0u64;
        while forwarded < limit {
            let record = match input.recv().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(_) => return Err(CommandError::Interrupted),
            };
            match output.send(record).await {
                Ok(()) => forwarded += 1,
                Err(SendError::Closed) => break,
                Err(SendError::Interrupted) => return Err(CommandError::Interrupted),
            }
        }

        Ok(ExitStatus::SUCCESS)
    }
}
