//! set — bind a session variable.

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;
use crate::state::lock;

use super::command::{Command, ExecContext};

pub struct Set;

#[async_trait]
impl Command for Set {
    fn name(&self) -> &str {
        "set"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        _output: OutChannel,
        _errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let (name, rest) = match args.split_first() {
            Some(split) => split,
            None => return Err(CommandError::msg("set: usage: set NAME VALUE")),
        };
        if !is_variable_name(name) {
            return Err(CommandError::msg(format!("set: invalid name '{name}'")));
        }
        if rest.is_empty() {
            return Err(CommandError::msg("set: usage: set NAME VALUE"));
        }

        let value = rest.join(" ");
        lock(&ctx.state).variables.insert(name.clone(), value);
        Ok(ExitStatus::SUCCESS)
    }
}

/// Valid variable names: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
