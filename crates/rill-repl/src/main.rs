//! rill CLI entry point.
//!
//! Usage:
//!   rill                # Interactive shell
//!   rill script.rill    # Run a script
//!
//! Environment, read once at startup:
//!   RILL_LOG            tracing filter directive (e.g. "debug",
//!                       "rill_kernel=trace")
//!   RILL_NO_HISTORY     boolean-like; disables history load/save

use std::env;
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Logging is opt-in: silent unless RILL_LOG says otherwise.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env("RILL_LOG").unwrap_or_else(|_| EnvFilter::new("off")))
        .init();

    let prog = prog_name();
    let mut scripts: Vec<String> = Vec::new();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                println!("rill {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            flag if flag.starts_with('-') => {
                eprintln!("{prog}: unrecognized option '{flag}'");
                return ExitCode::FAILURE;
            }
            script => scripts.push(script.to_string()),
        }
    }

    if scripts.len() > 1 {
        eprintln!("{prog}: too many scripts");
        return ExitCode::FAILURE;
    }

    let history_enabled = !boolish(env::var("RILL_NO_HISTORY").ok().as_deref());

    let result = match scripts.first() {
        Some(script) => rill_repl::run_script(script),
        None => rill_repl::run(history_enabled),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{prog}: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn prog_name() -> String {
    env::args()
        .next()
        .as_deref()
        .and_then(|argv0| argv0.rsplit('/').next().map(str::to_string))
        .unwrap_or_else(|| "rill".to_string())
}

/// "1", "true", "yes" (any case) count as set.
fn boolish(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn print_help() {
    println!(
        r#"rill {} — a structured-row command shell

Usage:
  rill                 Interactive shell
  rill <script>        Run a script file

Options:
  -h, --help           Show this help
  -v, --version        Show version

Environment:
  RILL_LOG             Tracing filter (e.g. "debug", "rill_kernel=trace")
  RILL_NO_HISTORY      Set to 1/true/yes to disable history
"#,
        env!("CARGO_PKG_VERSION")
    );
}
