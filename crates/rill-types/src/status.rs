//! Statement and program outcome codes.

use std::fmt;

/// Bounded integer outcome of a statement or whole program.
///
/// 0 is success; 1 is the repository's generic-error convention;
/// anything else comes from an explicit `exit N` or a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(u8);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    pub const ERROR: ExitStatus = ExitStatus(1);

    /// Build from an arbitrary integer, clamped into `0..=255`.
    /// Negative codes collapse to the generic error status.
    pub fn code(code: i64) -> ExitStatus {
        if code < 0 {
            ExitStatus::ERROR
        } else if code > 255 {
            ExitStatus(255)
        } else {
            ExitStatus(code as u8)
        }
    }

    /// Derive from an OS process outcome. A missing code means the
    /// process died to a signal, which counts as an error.
    pub fn from_process(code: Option<i32>) -> ExitStatus {
        match code {
            Some(c) => ExitStatus::code(c as i64),
            None => ExitStatus::ERROR,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn is_error(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_error() {
        assert!(ExitStatus::SUCCESS.is_success());
        assert!(!ExitStatus::SUCCESS.is_error());
        assert!(ExitStatus::ERROR.is_error());
        assert_eq!(ExitStatus::code(42).value(), 42);
    }

    #[test]
    fn clamping() {
        assert_eq!(ExitStatus::code(-1), ExitStatus::ERROR);
        assert_eq!(ExitStatus::code(300).value(), 255);
        assert_eq!(ExitStatus::code(0), ExitStatus::SUCCESS);
    }

    #[test]
    fn process_codes() {
        assert_eq!(ExitStatus::from_process(Some(0)), ExitStatus::SUCCESS);
        assert_eq!(ExitStatus::from_process(Some(2)).value(), 2);
        assert_eq!(ExitStatus::from_process(None), ExitStatus::ERROR);
    }
}
