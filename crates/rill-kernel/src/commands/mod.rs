//! Built-in commands for rill.
//!
//! The catalogue is intentionally small: the commands here are the ones
//! needed to exercise the engine's contracts — producers (`rand`,
//! `glob`), consumers (`take`, `count`, `capture`), state mutators
//! (`cd`, `set`, `exit`), wrappers (`benchmark`, `time`), and the
//! always-failing `fail` probe.

mod benchmark;
mod capture;
mod cd;
mod command;
mod count;
mod echo;
mod exit;
pub mod external;
mod fail;
mod glob;
mod rand;
mod set;
mod take;
mod time;

pub use command::{Command, ExecContext, Wrapper, WrapperResource};

use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a command implementation. Called once per compiled
/// statement, so wrappers get a fresh instance per statement.
#[derive(Clone, Copy)]
pub enum Factory {
    Command(fn() -> Arc<dyn Command>),
    Wrapper(fn() -> Arc<dyn Wrapper>),
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factory::Command(_) => f.write_str("Factory::Command"),
            Factory::Wrapper(_) => f.write_str("Factory::Wrapper"),
        }
    }
}

/// Name → factory table of builtin commands.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    table: HashMap<String, Factory>,
}

impl CommandSet {
    pub fn new() -> CommandSet {
        CommandSet::default()
    }

    pub fn register_command(&mut self, name: &str, make: fn() -> Arc<dyn Command>) {
        self.table.insert(name.to_string(), Factory::Command(make));
    }

    pub fn register_wrapper(&mut self, name: &str, make: fn() -> Arc<dyn Wrapper>) {
        self.table.insert(name.to_string(), Factory::Wrapper(make));
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<Factory> {
        self.table.get(name).copied()
    }

    /// Registered names, sorted — completion candidates.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Register the builtin catalogue.
pub fn register_builtins(set: &mut CommandSet) {
    set.register_command("capture", || Arc::new(capture::Capture));
    set.register_command("cd", || Arc::new(cd::Cd));
    set.register_command("count", || Arc::new(count::Count));
    set.register_command("echo", || Arc::new(echo::Echo));
    set.register_command("exit", || Arc::new(exit::Exit));
    set.register_command("fail", || Arc::new(fail::Fail));
    set.register_command("glob", || Arc::new(glob::Glob));
    set.register_command("rand", || Arc::new(rand::Rand));
    set.register_command("set", || Arc::new(set::Set));
    set.register_command("take", || Arc::new(take::Take));
    set.register_wrapper("benchmark", || Arc::new(benchmark::Benchmark::new()));
    set.register_wrapper("time", || Arc::new(time::Time));
}
