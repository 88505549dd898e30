//! External process stages.
//!
//! A pipeline stage that resolved to an executable runs as an OS child
//! with two forwarding workers: one drains the stage's input channel
//! into the child's stdin (one record, one line), one wraps stdout
//! lines into `{line: ...}` rows on the output channel. The stage's
//! status is the child's exit code; stderr stays inherited so the
//! child's own diagnostics reach the terminal unmediated.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command as OsCommand;
use tracing::debug;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;
use crate::state::lock;

use super::command::ExecContext;

/// Spawn and supervise one external stage to completion.
pub async fn run(
    path: &Path,
    name: &str,
    args: &[String],
    input: InChannel,
    output: OutChannel,
    ctx: &ExecContext,
) -> Result<ExitStatus, CommandError> {
    let (cwd, env) = {
        let state = lock(&ctx.state);
        (state.cwd.clone(), state.variables.clone())
    };

    let mut command = OsCommand::new(path);
    command
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        command: name.to_string(),
        source,
    })?;
    debug!(command = name, path = %path.display(), "spawned external stage");

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();

    // Feed the input stream to the child. Dropping stdin at EOF is what
    // tells the child its input is done.
    let feeder = tokio::spawn(async move {
        let Some(mut stdin) = stdin else { return };
        let mut input = input;
        while let Ok(Some(record)) = input.recv().await {
            let mut line = record.to_line();
            line.push('\n');
            if stdin.write_all(line.as_bytes()).await.is_err() {
                // Child closed its end; stop feeding.
                break;
            }
        }
    });

    // Wrap each stdout line as a single-column text row. When the
    // reader stops (downstream gone), dropping stdout gives the child a
    // broken pipe on its next write.
    let reader = tokio::spawn(async move {
        let Some(stdout) = stdout else { return };
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let record = match Record::single("line", Value::Text(line)) {
                Ok(record) => record,
                Err(_) => break,
            };
            if output.send(record).await.is_err() {
                break;
            }
        }
    });

    let status = tokio::select! {
        biased;
        _ = ctx.interrupt.raised() => {
            let _ = child.kill().await;
            feeder.abort();
            reader.abort();
            return Err(CommandError::Interrupted);
        }
        waited = child.wait() => match waited {
            Ok(status) => ExitStatus::from_process(status.code()),
            Err(source) => {
                feeder.abort();
                reader.abort();
                return Err(CommandError::Io { command: name.to_string(), source });
            }
        }
    };

    // The child is gone: stop feeding (unblocks any upstream producer)
    // and let the reader drain whatever stdout still buffers.
    feeder.abort();
    let _ = feeder.await;
    let _ = reader.await;

    Ok(status)
}
