//! Session facade.
//!
//! One [`Session`] owns the shared state and turns source text into
//! results: compile against the current state, evaluate, report. This
//! is what embedders (the REPL binary, integration tests) talk to; they
//! bring their own output channels and interrupt.

use tracing::instrument;

use rill_types::ExitStatus;

use crate::channel::{Interrupt, OutChannel};
use crate::compiler::Compiler;
use crate::error::ShellError;
use crate::interpreter::Interpreter;
use crate::state::{lock, SharedState, State};

pub struct Session {
    state: SharedState,
}

impl Session {
    /// A session seeded from the process environment.
    pub fn new() -> Session {
        Session::with_state(State::new())
    }

    pub fn with_state(state: State) -> Session {
        Session {
            state: state.shared(),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Compile and evaluate one input. Compile-class failures come back
    /// as `Err`; runtime failures are already folded into the status and
    /// the error sink.
    #[instrument(skip_all, fields(bytes = source.len()))]
    pub async fn execute(
        &self,
        source: &str,
        out: OutChannel,
        err: OutChannel,
        interrupt: Interrupt,
    ) -> Result<ExitStatus, ShellError> {
        let program = {
            let state = lock(&self.state);
            Compiler::new(&state).compile(source)?
        };
        let interpreter = Interpreter::new(self.state.clone(), interrupt);
        Ok(interpreter.eval(&program, out, err).await)
    }

    /// Whether `exit` has been requested.
    pub fn exit_requested(&self) -> bool {
        lock(&self.state).exit_requested
    }

    /// Completion candidates: registered command names and variable
    /// names, both sorted.
    pub fn completions(&self) -> (Vec<String>, Vec<String>) {
        let state = lock(&self.state);
        let commands = state.commands.names();
        let mut variables: Vec<String> = state.variables.keys().cloned().collect();
        variables.sort();
        (commands, variables)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{channel, CHANNEL_CAPACITY};

    #[tokio::test]
    async fn compile_errors_come_back_as_err() {
        let session = Session::with_state(State::bare());
        let interrupt = Interrupt::new();
        let out = OutChannel::null(interrupt.clone());
        let err = OutChannel::null(interrupt.clone());

        let result = session.execute("definitely_missing", out, err, interrupt).await;
        assert!(matches!(result, Err(ShellError::UnknownCommand { line: 1, .. })));
    }

    #[tokio::test]
    async fn execute_streams_rows() {
        let session = Session::with_state(State::bare());
        let interrupt = Interrupt::new();
        let (out_tx, mut out_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());
        let err = OutChannel::null(interrupt.clone());

        let status = session
            .execute("echo streamed", out_tx, err, interrupt)
            .await
            .unwrap();
        assert!(status.is_success());
        let record = out_rx.recv().await.unwrap().unwrap();
        assert_eq!(record.to_line(), "streamed");
    }

    #[tokio::test]
    async fn completions_track_state() {
        let session = Session::with_state(State::bare());
        let (commands, variables) = session.completions();
        assert!(commands.contains(&"echo".to_string()));
        assert!(variables.is_empty());

        let interrupt = Interrupt::new();
        let out = OutChannel::null(interrupt.clone());
        let err = OutChannel::null(interrupt.clone());
        session
            .execute("set GREETING hi", out, err, interrupt)
            .await
            .unwrap();

        let (_, variables) = session.completions();
        assert_eq!(variables, vec!["GREETING".to_string()]);
    }

    #[tokio::test]
    async fn exit_flag_is_visible() {
        let session = Session::with_state(State::bare());
        assert!(!session.exit_requested());

        let interrupt = Interrupt::new();
        let out = OutChannel::null(interrupt.clone());
        let err = OutChannel::null(interrupt.clone());
        let status = session.execute("exit 7", out, err, interrupt).await.unwrap();
        assert_eq!(status.value(), 7);
        assert!(session.exit_requested());
    }
}
