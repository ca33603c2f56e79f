//! Shared helpers for the SQLite operation modules: timestamp formatting and
//! the "tolerate per-row decode failures" query runner (spec.md §4.1,
//! "Bulk reads tolerate per-row decode failures: log and skip, never abort
//! the whole query.").

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tracing::warn;

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Runs `scan` over every row yielded by `stmt`, logging and skipping rows
/// that fail to decode rather than aborting the whole query.
pub(crate) fn collect_tolerant<T>(
    rows: rusqlite::MappedRows<'_, impl FnMut(&Row<'_>) -> rusqlite::Result<T>>,
) -> Vec<T> {
    let mut out = Vec::new();
    for row in rows {
        match row {
            Ok(v) => out.push(v),
            Err(e) => warn!(error = %e, "skipping row that failed to decode"),
        }
    }
    out
}
