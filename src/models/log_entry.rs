use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Storage encoding for log entry timestamps. No timezone suffix: values are
/// UTC and the zone is applied when rendering.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[must_use]
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// A stored activity record. Entries are never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub username: String,
    pub start: String,
    pub end: String,
    pub notes: Option<String>,
    pub car: Option<String>,
    pub datetime: NaiveDateTime,
}

/// Input for appending a log entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub username: String,
    pub start: String,
    pub end: String,
    pub notes: Option<String>,
    pub timestamp: NaiveDateTime,
    pub car: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl From<SortOrder> for sea_orm::Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

/// Result of one `fetch_log_entries` call.
///
/// Owned and finite. Iterating by reference can be repeated; a new call to the
/// store produces a fresh value rather than reusing this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntries {
    entries: Vec<LogEntry>,
}

impl LogEntries {
    #[must_use]
    pub const fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl IntoIterator for LogEntries {
    type Item = LogEntry;
    type IntoIter = std::vec::IntoIter<LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a LogEntries {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
