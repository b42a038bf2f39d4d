//! Aggregation queries for statistics.

use super::Database;
use crate::types::{CategoryStatistics, CategoryStatsRow};
use anyhow::Result;
use rusqlite::Connection;

/// Per-category task counts by status, live categories and live tasks only.
pub(crate) fn fetch_category_stats(conn: &Connection) -> Result<Vec<CategoryStatsRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.parent_id,
                COUNT(t.id) AS tasks_total_count,
                COALESCE(SUM(CASE WHEN t.status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.status = 'in_progress' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.status = 'completed' THEN 1 ELSE 0 END), 0)
         FROM categories c
         LEFT JOIN tasks t ON t.category_id = c.id AND t.deleted_at IS NULL
         WHERE c.deleted_at IS NULL
         GROUP BY c.id, c.name, c.parent_id
         ORDER BY c.name, c.id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(CategoryStatsRow {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
                tasks_total_count: row.get(3)?,
                tasks_pending_count: row.get(4)?,
                tasks_in_progress_count: row.get(5)?,
                tasks_completed_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

impl Database {
    /// Compute category statistics from scratch. Callers normally go through
    /// the stats cache instead.
    pub fn compute_category_statistics(&self) -> Result<CategoryStatistics> {
        self.with_conn(|conn| Ok(CategoryStatistics::from_rows(fetch_category_stats(conn)?)))
    }
}
