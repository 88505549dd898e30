//! Tagged scalar values.
//!
//! A [`Value`] is one cell of a [`Record`](crate::Record). The set of
//! variants is closed: commands exchange these and nothing else, so a
//! consumer can always match exhaustively. Values are immutable once
//! built; transformations produce new values.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

/// Display style carried by [`Value::Styled`].
///
/// Styling is advisory: `Display` renders the inner value unchanged and
/// leaves ANSI escapes to the terminal renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// Error-indicating rendering (red in a terminal).
    Error,
    /// Emphasized rendering (bold in a terminal).
    Emphasis,
}

/// One tagged scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// The absent value. Sorts before everything else.
    None,
    /// UTF-8 text.
    Text(String),
    /// Signed 64-bit integer.
    Numeric(i64),
    /// Byte magnitude. Non-negative by construction.
    Size(u64),
    /// Elapsed time.
    Duration(Duration),
    /// A point in wall-clock time.
    Instant(SystemTime),
    /// Filesystem path.
    Path(PathBuf),
    /// Another value wrapped with a display style.
    Styled(Box<Value>, Style),
}

impl Value {
    /// Strip any styling and return the underlying value.
    pub fn unstyled(&self) -> &Value {
        match self {
            Value::Styled(inner, _) => inner.unstyled(),
            other => other,
        }
    }

    /// Wrap this value with a display style.
    pub fn styled(self, style: Style) -> Value {
        Value::Styled(Box::new(self), style)
    }

    /// Project to text. Yields nothing for non-text values.
    pub fn as_text(&self) -> Option<&str> {
        match self.unstyled() {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Project to an integer.
    pub fn as_numeric(&self) -> Option<i64> {
        match self.unstyled() {
            Value::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Project to a byte magnitude.
    pub fn as_size(&self) -> Option<u64> {
        match self.unstyled() {
            Value::Size(n) => Some(*n),
            _ => None,
        }
    }

    /// Project to a duration.
    pub fn as_duration(&self) -> Option<Duration> {
        match self.unstyled() {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Project to a point in time.
    pub fn as_instant(&self) -> Option<SystemTime> {
        match self.unstyled() {
            Value::Instant(t) => Some(*t),
            _ => None,
        }
    }

    /// Project to a path.
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self.unstyled() {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Rank used to order values of different types. `None` is lowest.
    fn type_rank(&self) -> u8 {
        match self.unstyled() {
            Value::None => 0,
            Value::Text(_) => 1,
            Value::Numeric(_) => 2,
            Value::Size(_) => 3,
            Value::Duration(_) => 4,
            Value::Instant(_) => 5,
            Value::Path(_) => 6,
            Value::Styled(..) => unreachable!("unstyled() strips styling"),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.unstyled(), other.unstyled()) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::None, _) => Ordering::Less,
            (_, Value::None) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Numeric(a), Value::Numeric(b)) => a.cmp(b),
            (Value::Size(a), Value::Size(b)) => a.cmp(b),
            (Value::Duration(a), Value::Duration(b)) => a.cmp(b),
            (Value::Instant(a), Value::Instant(b)) => a.cmp(b),
            (Value::Path(a), Value::Path(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Numeric(n) => write!(f, "{n}"),
            Value::Size(n) => f.write_str(&format_size(*n, decimal_separator())),
            Value::Duration(d) => f.write_str(&format_duration(*d)),
            Value::Instant(t) => {
                let local: DateTime<Local> = (*t).into();
                write!(f, "{}", local.format("%Y-%m-%d %H:%M:%S"))
            }
            Value::Path(p) => f.write_str(&p.display().to_string()),
            Value::Styled(inner, _) => inner.fmt(f),
        }
    }
}

/// Format a byte count as a human-scaled magnitude.
///
/// Binary 1024 base, one decimal place above the bytes range, with the
/// given decimal separator: `format_size(1536, '.')` → `"1.5KB"`.
pub fn format_size(bytes: u64, separator: char) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    let (scaled, suffix) = if bytes >= TB {
        (bytes as f64 / TB as f64, "TB")
    } else if bytes >= GB {
        (bytes as f64 / GB as f64, "GB")
    } else if bytes >= MB {
        (bytes as f64 / MB as f64, "MB")
    } else if bytes >= KB {
        (bytes as f64 / KB as f64, "KB")
    } else {
        return format!("{bytes}B");
    };

    let mut out = format!("{scaled:.1}{suffix}");
    if separator != '.' {
        out = out.replace('.', &separator.to_string());
    }
    out
}

/// Format a duration at a resolution matching its magnitude.
fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos < 1_000 {
        format!("{nanos}ns")
    } else if nanos < 1_000_000 {
        format!("{:.1}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.1}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

/// Decimal separator for the session, sniffed once from the locale
/// environment (`LC_ALL` > `LC_NUMERIC` > `LANG`).
fn decimal_separator() -> char {
    static SEPARATOR: OnceLock<char> = OnceLock::new();
    *SEPARATOR.get_or_init(|| {
        let locale = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LC_NUMERIC"))
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();
        separator_for_locale(&locale)
    })
}

/// Languages whose standard numeric format uses a decimal comma.
const COMMA_LOCALES: &[&str] = &[
    "de", "fr", "es", "it", "pt", "nl", "pl", "ru", "sv", "fi", "da", "nb", "cs", "tr",
];

fn separator_for_locale(locale: &str) -> char {
    let lang = locale.split(['_', '.', '@']).next().unwrap_or("");
    if COMMA_LOCALES.contains(&lang) {
        ','
    } else {
        '.'
    }
}
