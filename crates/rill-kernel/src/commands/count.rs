//! count — drain the input and emit the number of rows seen.

use async_trait::async_trait;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{InChannel, OutChannel, SendError};
use crate::error::CommandError;

use super::command::{Command, ExecContext};

pub struct Count;

#[async_trait]
impl Command for Count {
    fn name(&self) -> &str {
        "count"
    }

    async fn run(
        &self,
        _args: &[String],
        mut input: InChannel,
        output: OutChannel,
        _errors: OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let mut seen: i64 = 0;
        while let Some(_record) = input
            .recv()
            .await
            .map_err(|_| CommandError::Interrupted)?
        {
            seen += 1;
        }

        let record = Record::single("count", Value::Numeric(seen))?;
        match output.send(record).await {
            Ok(()) | Err(SendError::Closed) => Ok(ExitStatus::SUCCESS),
            Err(SendError::Interrupted) => Err(CommandError::Interrupted),
        }
    }
}
