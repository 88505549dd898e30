//! Ordered key→value rows.
//!
//! A [`Record`] is the unit of data flowing through a pipeline: an
//! ordered mapping from validated [`Key`]s to [`Value`]s. Insertion
//! order is semantically visible — it is the column order when a row is
//! rendered — and keys are unique within one record.

use std::fmt;

use thiserror::Error;

use crate::Value;

/// Error building a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("record key must not be empty")]
    Empty,
    #[error("record key '{0}' is not a single lowercase word")]
    NotLowercaseWord(String),
}

/// Error building a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("duplicate record key '{0}'")]
    DuplicateKey(String),
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// A validated record key: non-empty, a single lowercase word
/// (`[a-z][a-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Validate and build a key.
    pub fn new(name: impl Into<String>) -> Result<Key, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::Empty);
        }
        let mut chars = name.chars();
        let head_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let tail_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if head_ok && tail_ok {
            Ok(Key(name))
        } else {
            Err(KeyError::NotLowercaseWord(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered row of unique keys mapped to values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    columns: Vec<(Key, Value)>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Record {
        Record::default()
    }

    /// Build a single-column record.
    pub fn single(key: &str, value: Value) -> Result<Record, RecordError> {
        let mut record = Record::new();
        record.push(Key::new(key)?, value)?;
        Ok(record)
    }

    /// Append a column in place. Duplicate keys are rejected.
    pub fn push(&mut self, key: Key, value: Value) -> Result<(), RecordError> {
        if self.get(key.as_str()).is_some() {
            return Err(RecordError::DuplicateKey(key.as_str().to_string()));
        }
        self.columns.push((key, value));
        Ok(())
    }

    /// Produce a new record with the column appended last.
    pub fn append(&self, key: Key, value: Value) -> Result<Record, RecordError> {
        let mut next = self.clone();
        next.push(key, value)?;
        Ok(next)
    }

    /// Produce a new record with the column prepended first.
    pub fn prepend(&self, key: Key, value: Value) -> Result<Record, RecordError> {
        if self.get(key.as_str()).is_some() {
            return Err(RecordError::DuplicateKey(key.as_str().to_string()));
        }
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push((key, value));
        columns.extend(self.columns.iter().cloned());
        Ok(Record { columns })
    }

    /// Look up a column by key name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// Columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.columns.iter().map(|(k, v)| (k, v))
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The first column whose value is text, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.values().find_map(|v| v.as_text())
    }

    /// Render the row as one line: values joined by a single space, in
    /// column order. This is the wire form fed to an external process.
    pub fn to_line(&self) -> String {
        let parts: Vec<String> = self.values().map(|v| v.to_string()).collect();
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Key {
        Key::new(name).unwrap()
    }

    #[test]
    fn key_validation() {
        assert!(Key::new("name").is_ok());
        assert!(Key::new("line_2").is_ok());
        assert_eq!(Key::new(""), Err(KeyError::Empty));
        assert!(matches!(Key::new("Name"), Err(KeyError::NotLowercaseWord(_))));
        assert!(matches!(Key::new("two words"), Err(KeyError::NotLowercaseWord(_))));
        assert!(matches!(Key::new("2nd"), Err(KeyError::NotLowercaseWord(_))));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut record = Record::new();
        record.push(key("name"), Value::Text("a".into())).unwrap();
        let err = record.push(key("name"), Value::Text("b".into()));
        assert_eq!(err, Err(RecordError::DuplicateKey("name".into())));
    }

    #[test]
    fn structural_equality_and_order() {
        let mut a = Record::new();
        a.push(key("name"), Value::Text("x".into())).unwrap();
        a.push(key("count"), Value::Numeric(3)).unwrap();

        let mut b = Record::new();
        b.push(key("name"), Value::Text("x".into())).unwrap();
        b.push(key("count"), Value::Numeric(3)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_line(), b.to_line());

        // Same columns in a different order is a different record.
        let mut c = Record::new();
        c.push(key("count"), Value::Numeric(3)).unwrap();
        c.push(key("name"), Value::Text("x".into())).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn prepend_and_append_leave_original_untouched() {
        let base = Record::single("name", Value::Text("x".into())).unwrap();
        let appended = base.append(key("size"), Value::Size(10)).unwrap();
        let prepended = base.prepend(key("idx"), Value::Numeric(0)).unwrap();

        assert_eq!(base.len(), 1);
        assert_eq!(appended.iter().last().unwrap().0.as_str(), "size");
        assert_eq!(prepended.iter().next().unwrap().0.as_str(), "idx");
    }

    #[test]
    fn prepend_duplicate_rejected() {
        let base = Record::single("name", Value::Text("x".into())).unwrap();
        assert!(base.prepend(key("name"), Value::None).is_err());
    }

    #[test]
    fn to_line_joins_values_in_column_order() {
        let mut record = Record::new();
        record.push(key("greeting"), Value::Text("hello".into())).unwrap();
        record.push(key("count"), Value::Numeric(2)).unwrap();
        assert_eq!(record.to_line(), "hello 2");
    }

    #[test]
    fn first_text_skips_non_text() {
        let mut record = Record::new();
        record.push(key("count"), Value::Numeric(1)).unwrap();
        record.push(key("name"), Value::Text("x".into())).unwrap();
        assert_eq!(record.first_text(), Some("x"));
    }
}
