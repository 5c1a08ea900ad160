pub mod log_entry;

pub use log_entry::{
    LogEntries, LogEntry, NewLogEntry, SortOrder, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp,
};
