//! fail — always report a runtime failure.
//!
//! Exists to probe the engine's containment contract: the failure must
//! surface as one error row plus an error status without disturbing
//! sibling pipeline stages.

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;

use super::command::{Command, ExecContext};

pub struct Fail;

#[async_trait]
impl Command for Fail {
    fn name(&self) -> &str {
        "fail"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        _output: OutChannel,
        _errors: OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let message = if args.is_empty() {
            "fail: intentional failure".to_string()
        } else {
            args.join(" ")
        };
        Err(CommandError::msg(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Interrupt;
    use crate::state::State;

    #[tokio::test]
    async fn always_errors_with_the_message() {
        let interrupt = Interrupt::new();
        let ctx = ExecContext::new(State::bare().shared(), interrupt.clone());
        let result = Fail
            .run(
                &["boom".into()],
                InChannel::empty(interrupt.clone()),
                OutChannel::null(interrupt.clone()),
                OutChannel::null(interrupt),
                &ctx,
            )
            .await;
        assert!(matches!(result, Err(CommandError::Message(m)) if m == "boom"));
    }
}
