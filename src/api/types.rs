use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::LogEntry;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogEntryDto {
    pub start: String,
    pub end: String,
    pub notes: Option<String>,
    pub car: Option<String>,
    /// RFC 3339 in the session timezone
    pub datetime: String,
    /// `YYYY-MM-DD HH:MM:SS` in the session timezone
    pub local_time: String,
}

impl LogEntryDto {
    #[must_use]
    pub fn render(entry: LogEntry, tz: Tz) -> Self {
        let local = Utc.from_utc_datetime(&entry.datetime).with_timezone(&tz);

        Self {
            start: entry.start,
            end: entry.end,
            notes: entry.notes,
            car: entry.car,
            datetime: local.to_rfc3339(),
            local_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogPageResponse {
    pub page: u64,
    pub total_pages: u64,
    pub timezone: String,
    pub entries: Vec<LogEntryDto>,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub timezone: String,
    pub entries: Vec<LogEntryDto>,
}

#[derive(Debug, Deserialize)]
pub struct NewLogEntryRequest {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub car: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimezoneRequest {
    pub timezone: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
