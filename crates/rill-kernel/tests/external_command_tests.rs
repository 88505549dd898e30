//! Integration tests for external command resolution and piping.
//!
//! These exercise the PATH fallback and the stdin/stdout forwarding
//! workers against real executables, so they are unix-only.

#![cfg(unix)]

use std::path::PathBuf;

use rill_kernel::channel::{channel, Interrupt, OutChannel, CHANNEL_CAPACITY};
use rill_kernel::error::ShellError;
use rill_kernel::session::Session;
use rill_kernel::state::State;
use rill_types::ExitStatus;

fn session_with_path() -> Session {
    let mut state = State::bare();
    state.cwd = std::env::temp_dir();
    state.path = vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")];
    Session::with_state(state)
}

async fn run(session: &Session, source: &str) -> (ExitStatus, Vec<String>) {
    let interrupt = Interrupt::new();
    let (out_tx, mut out_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());
    let err = OutChannel::null(interrupt.clone());

    let rows = tokio::spawn(async move {
        let mut rows = Vec::new();
        while let Ok(Some(record)) = out_rx.recv().await {
            rows.push(record.to_line());
        }
        rows
    });

    let status = session
        .execute(source, out_tx, err, interrupt)
        .await
        .expect("script should compile");
    (status, rows.await.expect("rows"))
}

#[tokio::test]
async fn builtin_wins_over_path() {
    // `echo` exists in /bin too; the builtin's single-row output proves
    // which one ran.
    let (status, rows) = run(&session_with_path(), "echo builtin wins").await;
    assert!(status.is_success());
    assert_eq!(rows, vec!["builtin wins"]);
}

#[tokio::test]
async fn external_exit_code_is_the_stage_status() {
    let (status, _) = run(&session_with_path(), "false").await;
    assert_eq!(status.value(), 1);

    let (status, _) = run(&session_with_path(), "true").await;
    assert!(status.is_success());
}

#[tokio::test]
async fn external_stdout_flows_into_the_pipeline() {
    // `cat` receives the builtin's rows over stdin and echoes them back
    // as line rows, which `count` then tallies.
    let (status, rows) = run(&session_with_path(), "rand | take 4 | cat | count").await;
    assert!(status.is_success());
    assert_eq!(rows, vec!["4"]);
}

#[tokio::test]
async fn external_command_output_rows() {
    let (status, rows) = run(&session_with_path(), "echo over the wire | cat").await;
    assert!(status.is_success());
    assert_eq!(rows, vec!["over the wire"]);
}

#[tokio::test]
async fn unknown_names_fail_at_compile_time_not_run_time() {
    let session = session_with_path();
    let interrupt = Interrupt::new();
    let out = OutChannel::null(interrupt.clone());
    let err = OutChannel::null(interrupt.clone());

    let result = session
        .execute("no_such_binary_anywhere_7f3", out, err, interrupt)
        .await;
    assert!(matches!(result, Err(ShellError::UnknownCommand { .. })));
}

#[tokio::test]
async fn interrupt_kills_a_long_running_external() {
    let session = session_with_path();
    let interrupt = Interrupt::new();
    let out = OutChannel::null(interrupt.clone());
    let err = OutChannel::null(interrupt.clone());

    let raiser = tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            interrupt.raise();
        }
    });

    let status = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        session.execute("sleep 30", out, err, interrupt),
    )
    .await
    .expect("interrupted external command hung")
    .expect("script should compile");

    assert!(status.is_error());
    raiser.await.expect("raiser");
}
