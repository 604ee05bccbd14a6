//! Cross-task references of the form `task_name.field[.nested...]`.
//!
//! Grammar:
//!
//! ```text
//! reference := task_name "." field ( "." field )*
//! task_name := one or more characters other than "."
//! field     := one or more characters other than "."
//! ```
//!
//! Parsing happens when a task is built; resolution happens against the run
//! context when the task executes (see [`crate::TaskContext::resolve`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::TaskStatus;

/// A parsed `task.field` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    task: String,
    path: Vec<String>,
}

impl Reference {
    pub fn new(task: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            path: vec![field.into()],
        }
    }

    /// Name of the upstream task.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Field path inside the upstream task's output (at least one segment).
    pub fn path(&self) -> &[String] {
        &self.path
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task, self.path.join("."))
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let task = parts.next().unwrap_or_default();
        let path: Vec<String> = parts.map(str::to_owned).collect();

        if task.is_empty() || path.is_empty() || path.iter().any(String::is_empty) {
            return Err(ReferenceError::Malformed(s.to_owned()));
        }

        Ok(Self {
            task: task.to_owned(),
            path,
        })
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Why a reference could not be parsed or resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("malformed reference '{0}': expected 'task_name.field'")]
    Malformed(String),

    #[error("unresolved reference '{reference}': no result for task '{task}'")]
    UnknownTask { reference: String, task: String },

    #[error("unresolved reference '{reference}': task '{task}' finished with status {status}")]
    NoOutput {
        reference: String,
        task: String,
        status: TaskStatus,
    },

    #[error("unresolved reference '{reference}': field '{field}' not found")]
    MissingField { reference: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_and_field() {
        let r: Reference = "generate.items".parse().unwrap();
        assert_eq!(r.task(), "generate");
        assert_eq!(r.path(), ["items"]);
        assert_eq!(r.to_string(), "generate.items");
    }

    #[test]
    fn parses_nested_path() {
        let r: Reference = "grid.config.rows".parse().unwrap();
        assert_eq!(r.task(), "grid");
        assert_eq!(r.path(), ["config", "rows"]);
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in ["", "solo", ".field", "task.", "a..b"] {
            assert!(
                matches!(bad.parse::<Reference>(), Err(ReferenceError::Malformed(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_from_json_string() {
        let r: Reference = serde_json::from_str("\"lights.lights\"").unwrap();
        assert_eq!(r, Reference::new("lights", "lights"));
        assert!(serde_json::from_str::<Reference>("\"nodot\"").is_err());
    }
}
