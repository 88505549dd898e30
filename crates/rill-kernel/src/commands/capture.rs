//! capture — drain the input stream into a session variable.
//!
//! Text values are joined with newlines and committed to the variable
//! map at EOF, so by the time the enclosing pipeline has joined, the
//! next sequential statement sees the binding.

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;
use crate::state::lock;

use super::command::{Command, ExecContext};
use super::set::is_variable_name;

pub struct Capture;

#[async_trait]
impl Command for Capture {
    fn name(&self) -> &str {
        "capture"
    }

    async fn run(
        &self,
        args: &[String],
        mut input: InChannel,
        _output: OutChannel,
        _errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let name = match args.first() {
            Some(name) if is_variable_name(name) => name.clone(),
            Some(name) => {
                return Err(CommandError::msg(format!("capture: invalid name '{name}'")))
            }
            None => return Err(CommandError::msg("capture: usage: capture NAME")),
        };

        let mut lines = Vec::new();
        while let Some(record) = input
            .recv()
            .await
            .map_err(|_| CommandError::Interrupted)?
        {
            match record.first_text() {
                Some(text) => lines.push(text.to_string()),
                None => lines.push(record.to_line()),
            }
        }

        lock(&ctx.state)
            .variables
            .insert(name, lines.join("\n"));
        Ok(ExitStatus::SUCCESS)
    }
}
