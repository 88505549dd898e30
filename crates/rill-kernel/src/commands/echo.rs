//! echo — emit the arguments as one text row.

use async_trait::async_trait;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;

use super::command::{Command, ExecContext};

pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        output: OutChannel,
        _errors: OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let text = args.join(" ");
        let record = Record::single("text", Value::Text(text))?;
        match output.send(record).await {
            Ok(()) | Err(crate::channel::SendError::Closed) => Ok(ExitStatus::SUCCESS),
            Err(crate::channel::SendError::Interrupted) => Err(CommandError::Interrupted),
        }
    }
}
