//! rill REPL — interactive loop and script runner.
//!
//! The interactive loop reads lines with rustyline (history and
//! completion included), feeds each to the kernel session, and renders
//! the resulting rows. Ctrl-C at the prompt yields a fresh prompt;
//! Ctrl-C mid-evaluation raises the session interrupt, which unwinds
//! the running pipeline and kills any child processes. Every error
//! class is caught per line — the loop itself never dies, only `exit`
//! or EOF ends it.

pub mod format;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};
use tokio::runtime::Runtime;
use tracing::debug;

use rill_kernel::channel::{channel, Interrupt, CHANNEL_CAPACITY};
use rill_kernel::error::ShellError;
use rill_kernel::session::Session;
use rill_kernel::state::{lock, SharedState};
use rill_types::ExitStatus;

const PROMPT: &str = "rill> ";

/// Run the interactive loop until `exit` or EOF. Returns the status of
/// the last executed line, which becomes the process exit code.
pub fn run(history_enabled: bool) -> Result<ExitCode> {
    let runtime = Runtime::new().context("failed to create tokio runtime")?;
    let session = Session::new();

    let helper = RillHelper {
        state: session.state(),
    };
    let mut editor: Editor<RillHelper, DefaultHistory> =
        Editor::new().context("failed to initialize line editor")?;
    editor.set_helper(Some(helper));

    let history_path = history_file();
    if history_enabled {
        if let Some(path) = &history_path {
            // A missing history file on first launch is not an error.
            let _ = editor.load_history(path);
        }
    }

    let mut last_status = ExitStatus::SUCCESS;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());

                match runtime.block_on(execute_line(&session, &line)) {
                    Ok(status) => last_status = status,
                    Err(error) => {
                        // Parse/compile/variable failures: report and
                        // keep reading.
                        eprintln!("rill: {error}");
                        last_status = ExitStatus::ERROR;
                    }
                }

                if session.exit_requested() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(error).context("line editor failed"),
        }
    }

    if history_enabled {
        if let Some(path) = &history_path {
            let _ = editor.save_history(path);
        }
    }

    Ok(ExitCode::from(last_status.value()))
}

/// Run a script file: one compile, one evaluation. Any pre-execution
/// failure is terminal with exit code 1; an explicit `exit N` carries N.
pub fn run_script(path: &str) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {path}"))?;

    // Skip a shebang line if present.
    let source = if source.starts_with("#!") {
        source.split_once('\n').map(|(_, rest)| rest).unwrap_or("").to_string()
    } else {
        source
    };

    let runtime = Runtime::new().context("failed to create tokio runtime")?;
    let session = Session::new();

    match runtime.block_on(execute_line(&session, &source)) {
        Ok(status) => Ok(ExitCode::from(status.value())),
        Err(error) => {
            eprintln!("rill: {error}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Compile and evaluate one input, streaming rows to the terminal. A
/// Ctrl-C while the evaluation runs raises the interrupt and lets the
/// engine unwind; the call still joins every worker before returning.
async fn execute_line(session: &Session, source: &str) -> Result<ExitStatus, ShellError> {
    let interrupt = Interrupt::new();
    let (out_tx, mut out_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());
    let (err_tx, mut err_rx) = channel(CHANNEL_CAPACITY, interrupt.clone());

    let out_printer = tokio::spawn(async move {
        let color = std::io::stdout().is_terminal();
        while let Ok(Some(record)) = out_rx.recv().await {
            println!("{}", format::render(&record, color));
        }
    });
    let err_printer = tokio::spawn(async move {
        let color = std::io::stderr().is_terminal();
        while let Ok(Some(record)) = err_rx.recv().await {
            eprintln!("{}", format::render(&record, color));
        }
    });

    let execution = session.execute(source, out_tx, err_tx, interrupt.clone());
    tokio::pin!(execution);

    let result = loop {
        tokio::select! {
            result = &mut execution => break result,
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    debug!("interrupt requested");
                    interrupt.raise();
                }
            }
        }
    };

    let _ = out_printer.await;
    let _ = err_printer.await;
    result
}

/// History lives next to the other shell droppings in `$HOME`.
fn history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".rill_history"))
}

// ── completion ──

/// Feeds rustyline completion from the live session: command names in
/// command position, variable names inside `${...}`.
struct RillHelper {
    state: SharedState,
}

impl Completer for RillHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let head = &line[..pos];
        let word_start = head
            .rfind(|c: char| c.is_whitespace() || c == '|' || c == ';' || c == '{')
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &head[word_start..];

        // Inside a ${...} reference: offer variable names.
        if let Some(brace) = word.rfind("${") {
            let prefix = &word[brace + 2..];
            let state = lock(&self.state);
            let mut candidates: Vec<String> = state
                .variables
                .keys()
                .filter(|name| name.starts_with(prefix))
                .map(|name| format!("${{{name}}}"))
                .collect();
            candidates.sort();
            return Ok((word_start + brace, candidates));
        }

        // Command position: the first word of the statement.
        let in_command_position = head[..word_start].trim_end().is_empty()
            || head[..word_start]
                .trim_end()
                .ends_with(['|', ';', '{']);
        if in_command_position {
            let state = lock(&self.state);
            let candidates: Vec<String> = state
                .commands
                .names()
                .into_iter()
                .filter(|name| name.starts_with(word))
                .collect();
            return Ok((word_start, candidates));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for RillHelper {
    type Hint = String;
}

impl Highlighter for RillHelper {}
impl Validator for RillHelper {}
impl Helper for RillHelper {}
