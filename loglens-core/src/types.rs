//! Core domain types for loglens
//!
//! The central type is [`Record`], one normalized log event. Records are
//! immutable once created: classification and querying only compute derived
//! display attributes, they never mutate the record itself.
//!
//! [`FieldKey`] is the closed enumeration of queryable record attributes.
//! Every filter, sort, and suggestion operation resolves a field through
//! [`Record::field`], which returns a typed [`FieldValue`] so comparisons
//! can stay numeric for numeric fields.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Record
// ============================================

/// One normalized log event.
///
/// Produced by [`normalize`](crate::normalize::normalize), which never fails:
/// a payload that cannot be parsed becomes a synthetic "raw" record instead.
///
/// Invariant: `messages` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Role/type of the emitting party
    #[serde(default)]
    pub role: String,
    /// Additional labeling information (tag)
    #[serde(default)]
    pub label: String,
    /// Source file path where the log originated
    #[serde(default)]
    pub file: String,
    /// Function name where the log was generated
    #[serde(default)]
    pub function: String,
    /// Timestamp in epoch milliseconds
    #[serde(default)]
    pub time: i64,
    /// Process ID
    #[serde(default)]
    pub process_id: i64,
    /// Thread ID
    #[serde(default)]
    pub thread_id: i64,
    /// Line number in the source file
    #[serde(default)]
    pub line: i64,
    /// Numeric severity (0 = TRACE, rising)
    #[serde(default)]
    pub level: i64,
    /// Log message lines; never empty
    pub messages: Vec<String>,
}

impl Record {
    /// The space-joined form of `messages`, used by full-text search and by
    /// the `messages` field key.
    pub fn joined_messages(&self) -> String {
        self.messages.join(" ")
    }

    /// File name component of `file`, handling both `/` and `\` separators.
    ///
    /// Returns the full path unchanged when it has no separator, and an
    /// empty string for an empty path.
    pub fn file_name(&self) -> &str {
        if self.file.is_empty() {
            return "";
        }
        self.file
            .rsplit(['/', '\\'])
            .find(|part| !part.is_empty())
            .unwrap_or(&self.file)
    }

    /// Local-time rendering of `time` for display.
    ///
    /// An out-of-range timestamp renders as an empty string.
    pub fn formatted_time(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.time)
            .map(|t| {
                t.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default()
    }

    /// Resolve a queryable field to its typed value.
    pub fn field(&self, key: FieldKey) -> FieldValue {
        match key {
            FieldKey::Time => FieldValue::Int(self.time),
            FieldKey::Level => FieldValue::Int(self.level),
            FieldKey::ProcessId => FieldValue::Int(self.process_id),
            FieldKey::ThreadId => FieldValue::Int(self.thread_id),
            FieldKey::Line => FieldValue::Int(self.line),
            FieldKey::File => FieldValue::Text(self.file.clone()),
            FieldKey::Function => FieldValue::Text(self.function.clone()),
            FieldKey::Role => FieldValue::Text(self.role.clone()),
            FieldKey::Label => FieldValue::Text(self.label.clone()),
            FieldKey::Messages => FieldValue::Text(self.joined_messages()),
        }
    }
}

// ============================================
// Field keys and values
// ============================================

/// Closed enumeration of the queryable [`Record`] attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Time,
    Level,
    ProcessId,
    ThreadId,
    File,
    Line,
    Function,
    Role,
    Label,
    Messages,
}

impl FieldKey {
    /// Identifier used in query specs and persisted rules
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Time => "time",
            FieldKey::Level => "level",
            FieldKey::ProcessId => "process_id",
            FieldKey::ThreadId => "thread_id",
            FieldKey::File => "file",
            FieldKey::Line => "line",
            FieldKey::Function => "function",
            FieldKey::Role => "role",
            FieldKey::Label => "label",
            FieldKey::Messages => "messages",
        }
    }

    /// All field keys, in display order.
    pub fn all() -> &'static [FieldKey] {
        &[
            FieldKey::Time,
            FieldKey::Level,
            FieldKey::ProcessId,
            FieldKey::ThreadId,
            FieldKey::File,
            FieldKey::Line,
            FieldKey::Function,
            FieldKey::Role,
            FieldKey::Label,
            FieldKey::Messages,
        ]
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(FieldKey::Time),
            "level" => Ok(FieldKey::Level),
            "process_id" => Ok(FieldKey::ProcessId),
            "thread_id" => Ok(FieldKey::ThreadId),
            "file" => Ok(FieldKey::File),
            "line" => Ok(FieldKey::Line),
            "function" => Ok(FieldKey::Function),
            "role" => Ok(FieldKey::Role),
            "label" => Ok(FieldKey::Label),
            "messages" => Ok(FieldKey::Messages),
            _ => Err(format!("unknown field key: {}", s)),
        }
    }
}

/// A resolved field value, typed so sorting can compare numerically where
/// both operands are numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// ============================================
// Built-in level table
// ============================================

/// Built-in severity name for a numeric level.
///
/// Levels 0-4 map to TRACE/DEBUG/WARNING/ERROR/CRITICAL; anything else
/// degrades to DEBUG for level <= 1 and INFO otherwise. Used whenever no
/// level rule set is enabled or the enabled set has no mapping for the level.
pub fn builtin_level_name(level: i64) -> &'static str {
    match level {
        0 => "TRACE",
        1 => "DEBUG",
        2 => "WARNING",
        3 => "ERROR",
        4 => "CRITICAL",
        _ if level <= 1 => "DEBUG",
        _ => "INFO",
    }
}

/// Built-in color paired with [`builtin_level_name`].
///
/// INFO has no entry of its own and shares the DEBUG color.
pub fn builtin_level_color(level: i64) -> &'static str {
    match builtin_level_name(level) {
        "TRACE" => "#9e9e9e",
        "WARNING" => "#ff9800",
        "ERROR" => "#f44336",
        "CRITICAL" => "#d32f2f",
        _ => "#2196f3",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            role: "admin".to_string(),
            label: "security".to_string(),
            file: "/srv/app/main.py".to_string(),
            function: "handle".to_string(),
            time: 1_700_000_000_000,
            process_id: 42,
            thread_id: 7,
            line: 120,
            level: 3,
            messages: vec!["first".to_string(), "second".to_string()],
        }
    }

    #[test]
    fn test_joined_messages() {
        assert_eq!(record().joined_messages(), "first second");
    }

    #[test]
    fn test_file_name_extraction() {
        let mut r = record();
        assert_eq!(r.file_name(), "main.py");

        r.file = "C:\\logs\\app.rs".to_string();
        assert_eq!(r.file_name(), "app.rs");

        r.file = "bare.rs".to_string();
        assert_eq!(r.file_name(), "bare.rs");

        r.file = String::new();
        assert_eq!(r.file_name(), "");
    }

    #[test]
    fn test_field_resolution_types() {
        let r = record();
        assert_eq!(r.field(FieldKey::Level), FieldValue::Int(3));
        assert_eq!(
            r.field(FieldKey::Messages),
            FieldValue::Text("first second".to_string())
        );
        assert_eq!(
            r.field(FieldKey::Role),
            FieldValue::Text("admin".to_string())
        );
    }

    #[test]
    fn test_field_key_round_trip() {
        for key in FieldKey::all() {
            assert_eq!(key.as_str().parse::<FieldKey>().unwrap(), *key);
        }
        assert!("bogus".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_builtin_level_table() {
        assert_eq!(builtin_level_name(0), "TRACE");
        assert_eq!(builtin_level_name(4), "CRITICAL");
        assert_eq!(builtin_level_name(-3), "DEBUG");
        assert_eq!(builtin_level_name(9), "INFO");

        assert_eq!(builtin_level_color(3), "#f44336");
        // INFO falls back to the DEBUG color
        assert_eq!(builtin_level_color(9), "#2196f3");
    }
}
