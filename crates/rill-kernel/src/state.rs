//! Session state.
//!
//! One [`State`] lives for the whole session (script mode: one run;
//! interactive: until `exit`). It is the only cross-stage shared mutable
//! object, held behind a std mutex with short critical sections. The
//! mutating builtins (`cd`, `set`, `capture`, `exit`) take the lock for
//! the duration of their mutation, so no two pipeline stages ever write
//! concurrently.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::commands::{register_builtins, CommandSet};

/// The single mutable session context.
#[derive(Debug)]
pub struct State {
    /// Current working directory. Absolute and lexically normalized.
    pub cwd: PathBuf,
    /// Variable bindings, seeded from the OS environment.
    pub variables: HashMap<String, String>,
    /// External command search list.
    pub path: Vec<PathBuf>,
    /// Builtin command table.
    pub commands: CommandSet,
    /// Set by `exit`; stops sequence evaluation and the REPL loop.
    pub exit_requested: bool,
}

/// Shared handle to the session state.
pub type SharedState = Arc<Mutex<State>>;

/// Take the state lock, shrugging off poisoning — the short critical
/// sections in this crate leave no torn invariants behind.
pub fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl State {
    /// A session seeded from the process environment: cwd, variables,
    /// and `$PATH`, with the builtin table registered.
    pub fn new() -> State {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let variables: HashMap<String, String> = std::env::vars().collect();
        let path = variables
            .get("PATH")
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default();

        let mut commands = CommandSet::new();
        register_builtins(&mut commands);

        State {
            cwd: normalize(&cwd, Path::new("")),
            variables,
            path,
            commands,
            exit_requested: false,
        }
    }

    /// An isolated session for tests: no inherited variables, no PATH,
    /// cwd at `/`, builtins registered.
    pub fn bare() -> State {
        let mut commands = CommandSet::new();
        register_builtins(&mut commands);
        State {
            cwd: PathBuf::from("/"),
            variables: HashMap::new(),
            path: Vec::new(),
            commands,
            exit_requested: false,
        }
    }

    /// Wrap into the shared handle the interpreter and commands use.
    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Resolve `path` against the session cwd into an absolute,
    /// lexically normalized path (`.` and `..` folded away).
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        normalize(&self.cwd, path)
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

/// Join `path` onto `base` and fold `.`/`..` components lexically.
fn normalize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut parts: Vec<Component> = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    parts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dots() {
        let base = Path::new("/home/user");
        assert_eq!(normalize(base, Path::new("src/../docs")), PathBuf::from("/home/docs"));
        assert_eq!(normalize(base, Path::new("./src")), PathBuf::from("/home/user/src"));
        assert_eq!(normalize(base, Path::new("/etc/./x")), PathBuf::from("/etc/x"));
    }

    #[test]
    fn normalize_stops_at_root() {
        assert_eq!(
            normalize(Path::new("/"), Path::new("../../etc")),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn resolve_path_relative_to_cwd() {
        let mut state = State::bare();
        state.cwd = PathBuf::from("/tmp/work");
        assert_eq!(state.resolve_path(Path::new("..")), PathBuf::from("/tmp"));
        assert_eq!(state.resolve_path(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn bare_state_has_builtins() {
        let state = State::bare();
        assert!(state.commands.get("echo").is_some());
        assert!(state.commands.get("benchmark").is_some());
        assert!(state.variables.is_empty());
    }
}
