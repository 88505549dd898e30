//! Command name resolution.
//!
//! Builtin-first, then external: an exact, case-sensitive hit in the
//! session's command table wins; otherwise the PATH search list is
//! walked in order and the first executable file named `name` becomes an
//! external binding. Resolution is a compile-time step — an unresolvable
//! name aborts the compile before anything runs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::commands::{Command, CommandSet, Factory, Wrapper};
use crate::state::State;

/// A resolved command, bound into a compiled statement.
#[derive(Clone)]
pub enum Binding {
    /// A builtin command instance.
    Command(Arc<dyn Command>),
    /// A wrapper instance. Fresh per compiled statement — wrappers carry
    /// per-statement interior state across retry cycles.
    Wrapper(Arc<dyn Wrapper>),
    /// An external executable.
    External(PathBuf),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Command(c) => write!(f, "Command({})", c.name()),
            Binding::Wrapper(w) => write!(f, "Wrapper({})", w.name()),
            Binding::External(p) => write!(f, "External({})", p.display()),
        }
    }
}

/// A compile-time snapshot of the session's command table and PATH.
#[derive(Debug, Clone)]
pub struct Resolver {
    commands: CommandSet,
    path: Vec<PathBuf>,
}

impl Resolver {
    pub fn from_state(state: &State) -> Resolver {
        Resolver {
            commands: state.commands.clone(),
            path: state.path.clone(),
        }
    }

    /// Resolve a name to a binding, or `None` for an unknown command.
    pub fn resolve(&self, name: &str) -> Option<Binding> {
        if let Some(factory) = self.commands.get(name) {
            return Some(match factory {
                Factory::Command(make) => Binding::Command(make()),
                Factory::Wrapper(make) => Binding::Wrapper(make()),
            });
        }

        // A name with a separator is taken as a literal path.
        if name.contains('/') {
            let candidate = PathBuf::from(name);
            return is_executable(&candidate).then_some(Binding::External(candidate));
        }

        resolve_in_path(name, &self.path).map(Binding::External)
    }
}

/// Search each directory in order for an executable named `name`.
/// First hit wins.
pub fn resolve_in_path(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        true
    }
}
