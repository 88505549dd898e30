//! exit — stop the session with an explicit status.

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;
use crate::state::lock;

use super::command::{Command, ExecContext};

pub struct Exit;

#[async_trait]
impl Command for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        _output: OutChannel,
        _errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let code = match args.first() {
            None => 0,
            Some(arg) => arg
                .parse::<i64>()
                .map_err(|_| CommandError::msg(format!("exit: invalid status '{arg}'")))?,
        };

        lock(&ctx.state).exit_requested = true;
        Ok(ExitStatus::code(code))
    }
}
