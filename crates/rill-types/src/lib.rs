//! rill-types: the data model shared by every rill crate.
//!
//! Rows flowing through a pipeline are [`Record`]s — ordered maps from
//! validated [`Key`]s to tagged [`Value`]s. Commands and whole programs
//! report their outcome as an [`ExitStatus`].
//!
//! This crate is deliberately leaf-level: no async, no I/O, no engine
//! types. Everything here is cheap to clone and structurally comparable.

mod record;
mod status;
mod value;

pub use record::{Key, KeyError, Record, RecordError};
pub use status::ExitStatus;
pub use value::{format_size, Style, Value};
