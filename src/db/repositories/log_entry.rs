use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::db::{MAX_ROW_BOUND, StoreError};
use crate::entities::log_entries;
use crate::models::log_entry::{
    LogEntries, LogEntry, NewLogEntry, SortOrder, format_timestamp, parse_timestamp,
};

pub struct LogEntryRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> LogEntryRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, entry: NewLogEntry) -> Result<i64, StoreError> {
        let active = log_entries::ActiveModel {
            username: Set(entry.username),
            start: Set(entry.start),
            end: Set(entry.end),
            notes: Set(entry.notes),
            date: Set(format_timestamp(entry.timestamp)),
            car: Set(entry.car),
            ..Default::default()
        };

        let result = log_entries::Entity::insert(active)
            .exec(self.conn)
            .await
            .map_err(|e| StoreError::storage("add_log_entry", e))?;

        Ok(result.last_insert_id)
    }

    /// Entries for one user, ordered by timestamp then insertion order.
    /// `limit: None` returns every row after `offset`.
    pub async fn fetch(
        &self,
        username: &str,
        sort: SortOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<LogEntries, StoreError> {
        let order = sea_orm::Order::from(sort);

        let rows = log_entries::Entity::find()
            .filter(log_entries::Column::Username.eq(username))
            .order_by(log_entries::Column::Date, order.clone())
            .order_by(log_entries::Column::Id, order)
            .limit(limit.unwrap_or(MAX_ROW_BOUND))
            .offset(offset)
            .all(self.conn)
            .await
            .map_err(|e| StoreError::storage("fetch_log_entries", e))?;

        let entries = rows
            .into_iter()
            .map(to_log_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogEntries::new(entries))
    }

    pub async fn count(&self, username: &str) -> Result<u64, StoreError> {
        log_entries::Entity::find()
            .filter(log_entries::Column::Username.eq(username))
            .count(self.conn)
            .await
            .map_err(|e| StoreError::storage("count_log_entries", e))
    }
}

fn to_log_entry(row: log_entries::Model) -> Result<LogEntry, StoreError> {
    let datetime = parse_timestamp(&row.date).map_err(|source| StoreError::MalformedTimestamp {
        value: row.date.clone(),
        source,
    })?;

    Ok(LogEntry {
        username: row.username,
        start: row.start,
        end: row.end,
        notes: row.notes,
        car: row.car,
        datetime,
    })
}
