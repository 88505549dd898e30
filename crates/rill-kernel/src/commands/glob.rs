//! glob — emit the cwd entries matching a shell-style pattern.
//!
//! Pattern syntax: `*` matches any run of characters, `?` exactly one,
//! `[abc]`/`[a-z]` a character set or range, `[!...]` its negation.
//! Matches are emitted as `{path: ...}` rows in sorted order.

use std::cell::Cell;

use async_trait::async_trait;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{InChannel, OutChannel, SendError};
use crate::error::CommandError;
use crate::state::lock;

use super::command::{Command, ExecContext};

/// Work bound for pattern matching. Protects against adversarial
/// patterns like `*a*a*a*...` with O(n^k) backtracking.
const MAX_MATCH_CALLS: usize = 100_000;

pub struct Glob;

#[async_trait]
impl Command for Glob {
    fn name(&self) -> &str {
        "glob"
    }

    async fn run(
        &self,
        args: &[String],
        _input: InChannel,
        output: OutChannel,
        _errors: OutChannel,
        ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let pattern = match args.first() {
            Some(pattern) => pattern.clone(),
            None => return Err(CommandError::msg("glob: usage: glob PATTERN")),
        };

        let cwd = lock(&ctx.state).cwd.clone();
        let mut entries = tokio::fs::read_dir(&cwd).await.map_err(|e| CommandError::Io {
            command: "glob".into(),
            source: e,
        })?;

        let mut matched = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| CommandError::Io {
            command: "glob".into(),
            source: e,
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if glob_match(&pattern, &name) {
                matched.push(entry.path());
            }
        }
        matched.sort();

        for path in matched {
            match output.send(Record::single("path", Value::Path(path))?).await {
                Ok(()) => {}
                Err(SendError::Closed) => return Ok(ExitStatus::SUCCESS),
                Err(SendError::Interrupted) => return Err(CommandError::Interrupted),
            }
        }
        Ok(ExitStatus::SUCCESS)
    }
}

/// Match a name against a glob pattern. The pattern must cover the
/// entire input.
pub fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();
    let calls = Cell::new(0usize);
    match_at(&pattern, 0, &input, 0, &calls)
}

fn match_at(pattern: &[char], p: usize, input: &[char], i: usize, calls: &Cell<usize>) -> bool {
    calls.set(calls.get() + 1);
    if calls.get() > MAX_MATCH_CALLS {
        return false;
    }

    if p == pattern.len() {
        return i == input.len();
    }

    match pattern[p] {
        '*' => {
            // Try every split, shortest first.
            for skip in i..=input.len() {
                if match_at(pattern, p + 1, input, skip, calls) {
                    return true;
                }
            }
            false
        }
        '?' => i < input.len() && match_at(pattern, p + 1, input, i + 1, calls),
        '[' => match parse_set(pattern, p) {
            Some((set_matches, next_p)) => {
                i < input.len() && set_matches(input[i]) && match_at(pattern, next_p, input, i + 1, calls)
            }
            // Unterminated set: treat the '[' literally.
            None => i < input.len() && input[i] == '[' && match_at(pattern, p + 1, input, i + 1, calls),
        },
        c => i < input.len() && input[i] == c && match_at(pattern, p + 1, input, i + 1, calls),
    }
}

/// Parse a `[...]` set starting at `p` (which points at `[`). Returns a
/// predicate and the index just past the closing `]`.
fn parse_set(pattern: &[char], p: usize) -> Option<(impl Fn(char) -> bool, usize)> {
    let mut idx = p + 1;
    let negated = matches!(pattern.get(idx), Some('!' | '^'));
    if negated {
        idx += 1;
    }

    let mut ranges: Vec<(char, char)> = Vec::new();
    let mut first = true;
    loop {
        let c = *pattern.get(idx)?;
        if c == ']' && !first {
            idx += 1;
            break;
        }
        first = false;
        if pattern.get(idx + 1) == Some(&'-') && pattern.get(idx + 2).is_some_and(|&e| e != ']') {
            let end = *pattern.get(idx + 2)?;
            ranges.push((c, end));
            idx += 3;
        } else {
            ranges.push((c, c));
            idx += 1;
        }
    }

    let predicate = move |c: char| {
        let inside = ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi);
        inside != negated
    };
    Some((predicate, idx))
}
