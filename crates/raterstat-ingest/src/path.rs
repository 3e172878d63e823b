//! Declarative paths into JSON documents.
//!
//! A [`RecordPath`] says where the task-result arrays live in an export, e.g.
//! `results.root_node.results.*.results`. Plain segments are object keys;
//! `*` descends into every value of the object at that level.

use std::fmt;
use std::str::FromStr;

use raterstat_core::config::DEFAULT_RECORD_PATH;
use serde_json::Value;

use crate::IngestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    segments: Vec<Segment>,
}

impl RecordPath {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Default for RecordPath {
    fn default() -> Self {
        Self {
            segments: DEFAULT_RECORD_PATH
                .split('.')
                .map(|s| match s {
                    "*" => Segment::Wildcard,
                    key => Segment::Key(key.to_string()),
                })
                .collect(),
        }
    }
}

impl FromStr for RecordPath {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| IngestError::InvalidRecordPath {
            path: s.to_string(),
            reason,
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(invalid("path is empty"));
        }
        let mut segments = Vec::new();
        for part in s.split('.') {
            match part {
                "" => return Err(invalid("empty segment")),
                "*" => segments.push(Segment::Wildcard),
                key => segments.push(Segment::Key(key.to_string())),
            }
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match seg {
                Segment::Key(k) => f.write_str(k)?,
                Segment::Wildcard => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// Follow a dotted field path (`task_output.answer`) through nested objects.
pub fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |v, key| v.as_object()?.get(key))
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
