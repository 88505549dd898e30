//! cd — change the session working directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use rill_types::ExitStatus;

use crate::channel::{InChannel, OutChannel};
use crate::error::CommandError;
use crate::state::lock;

use super::command::{Command, ExecContext};

pub struct Cd;

#[async_trait]
impl Command for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        _output: OutChannel,
        _errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let target: PathBuf = match args.first() {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lock(&ctx.state).variables.get("HOME").cloned();
                match home {
                    Some(home) => PathBuf::from(home),
                    None => return Err(CommandError::msg("cd: HOME not set")),
                }
            }
        };

        let resolved = lock(&ctx.state).resolve_path(&target);

        let metadata = tokio::fs::metadata(&resolved).await.map_err(|e| {
            CommandError::msg(format!("cd: {}: {e}", display(&target)))
        })?;
        if !metadata.is_dir() {
            return Err(CommandError::msg(format!(
                "cd: {}: not a directory",
                display(&target)
            )));
        }

        lock(&ctx.state).cwd = resolved;
        Ok(ExitStatus::SUCCESS)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Interrupt;
    use crate::state::State;

    async fn run_cd(ctx: &ExecContext, args: &[String]) -> Result<ExitStatus, CommandError> {
        let interrupt = ctx.interrupt.clone();
        Cd.run(
            args,
            InChannel::empty(interrupt.clone()),
            OutChannel::null(interrupt.clone()),
            OutChannel::null(interrupt),
            ctx,
        )
        .await
    }

    fn ctx() -> ExecContext {
        ExecContext::new(State::bare().shared(), Interrupt::new())
    }

    #[tokio::test]
    async fn changes_to_an_existing_directory() {
        let ctx = ctx();
        let tmp = std::env::temp_dir();
        run_cd(&ctx, &[tmp.display().to_string()]).await.unwrap();
        let state = lock(&ctx.state);
        assert_eq!(state.cwd, state.resolve_path(&tmp));
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let ctx = ctx();
        let result = run_cd(&ctx, &["/definitely/not/here".into()]).await;
        assert!(result.is_err());
        assert_eq!(lock(&ctx.state).cwd, PathBuf::from("/"));
    }

    #[tokio::test]
    async fn file_target_is_not_a_directory() {
        let ctx = ctx();
        let file = std::env::temp_dir().join(format!("rill-cd-test-{}", std::process::id()));
        tokio::fs::write(&file, b"x").await.unwrap();

        let result = run_cd(&ctx, &[file.display().to_string()]).await;
        assert!(matches!(result, Err(CommandError::Message(m)) if m.contains("not a directory")));

        let _ = tokio::fs::remove_file(&file).await;
    }

    #[tokio::test]
    async fn no_arg_uses_home_variable() {
        let ctx = ctx();
        let tmp = std::env::temp_dir().display().to_string();
        lock(&ctx.state).variables.insert("HOME".into(), tmp.clone());

        run_cd(&ctx, &[]).await.unwrap();
        let expected = lock(&ctx.state).resolve_path(Path::new(&tmp));
        assert_eq!(lock(&ctx.state).cwd, expected);
    }
}
