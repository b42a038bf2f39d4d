//! Task CRUD, filtered listing and task statistics.

use super::categories::find_category;
use super::{Database, LOWER_FN, now_ms};
use crate::error::AppError;
use crate::types::{
    LightTask, Priority, Task, TaskCategory, TaskFilters, TaskInput, TaskPage, TaskSorting,
    TaskStatistics, TaskStatus, TaskWithCategory,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

/// Maximum rows returned by the lightweight listing.
pub const LIGHT_LIST_LIMIT: i64 = 50;

const TASK_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date,
        t.category_id, t.created_at, t.updated_at, t.deleted_at,
        c.id AS category_ref_id, c.name AS category_name
     FROM tasks t
     LEFT JOIN categories c ON c.id = t.category_id AND c.deleted_at IS NULL";

fn parse_enum<T: FromStr<Err = String>>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
    })
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: parse_enum::<TaskStatus>(row, "status")?,
        priority: parse_enum::<Priority>(row, "priority")?,
        due_date: row.get("due_date")?,
        category_id: row.get("category_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

/// Parse a row produced by `TASK_SELECT`.
fn parse_task_with_category(row: &Row) -> rusqlite::Result<TaskWithCategory> {
    let task = parse_task_row(row)?;
    let category_id: Option<i64> = row.get("category_ref_id")?;
    let category_name: Option<String> = row.get("category_name")?;
    let category = match (category_id, category_name) {
        (Some(id), Some(name)) => Some(TaskCategory { id, name }),
        _ => None,
    };
    Ok(TaskWithCategory { task, category })
}

fn find_task(conn: &Connection, id: i64, include_trashed: bool) -> Result<Option<TaskWithCategory>> {
    let mut sql = format!("{} WHERE t.id = ?1", TASK_SELECT);
    if !include_trashed {
        sql.push_str(" AND t.deleted_at IS NULL");
    }
    let task = conn
        .query_row(&sql, params![id], parse_task_with_category)
        .optional()?;
    Ok(task)
}

fn reload(conn: &Connection, id: i64) -> Result<TaskWithCategory> {
    find_task(conn, id, true)?.ok_or_else(|| AppError::task_not_found(id).into())
}

/// A task may only point at a live category.
fn validate_category(conn: &Connection, category_id: Option<i64>) -> Result<()> {
    if let Some(category_id) = category_id
        && find_category(conn, category_id, false)?.is_none()
    {
        return Err(AppError::invalid_value("category_id", "Selected category is invalid.").into());
    }
    Ok(())
}

/// Escape `%`, `_` and `\` so the search term matches literally inside LIKE.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// WHERE clause plus bound parameters for a set of filters.
struct FilterClause {
    sql: String,
    params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl FilterClause {
    fn build(filters: &TaskFilters) -> Self {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(predicate) = filters.trashed.predicate("t") {
            conditions.push(predicate);
        }

        if let Some(status) = filters.status {
            params.push(Box::new(status.as_str()));
            conditions.push(format!("t.status = ?{}", params.len()));
        }

        if let Some(priority) = filters.priority {
            params.push(Box::new(priority.as_str()));
            conditions.push(format!("t.priority = ?{}", params.len()));
        }

        if let Some(category_id) = filters.category_id {
            params.push(Box::new(category_id));
            conditions.push(format!("t.category_id = ?{}", params.len()));
        }

        if let Some(term) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(Box::new(like_pattern(&term.to_lowercase())));
            let idx = params.len();
            conditions.push(format!(
                "({lower}(t.title) LIKE ?{idx} ESCAPE '\\' OR {lower}(t.description) LIKE ?{idx} ESCAPE '\\')",
                lower = LOWER_FN,
            ));
        }

        if let Some(from) = filters.due_from {
            params.push(Box::new(from));
            conditions.push(format!("t.due_date >= ?{}", params.len()));
        }

        if let Some(to) = filters.due_to {
            params.push(Box::new(to));
            conditions.push(format!("t.due_date <= ?{}", params.len()));
        }

        let sql = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        Self { sql, params }
    }

    fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|b| b.as_ref()).collect()
    }
}

impl Database {
    /// Create a task.
    pub fn create_task(&self, input: &TaskInput) -> Result<TaskWithCategory> {
        self.with_transaction(|tx| {
            validate_category(tx, input.category_id)?;

            let now = now_ms();
            tx.execute(
                "INSERT INTO tasks (title, description, status, priority, due_date, category_id,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority.as_str(),
                    input.due_date,
                    input.category_id,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();

            reload(tx, id)
        })
    }

    /// Update a live task.
    pub fn update_task(&self, id: i64, input: &TaskInput) -> Result<TaskWithCategory> {
        self.with_transaction(|tx| {
            if find_task(tx, id, false)?.is_none() {
                return Err(AppError::task_not_found(id).into());
            }

            validate_category(tx, input.category_id)?;

            tx.execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, status = ?3, priority = ?4,
                     due_date = ?5, category_id = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority.as_str(),
                    input.due_date,
                    input.category_id,
                    now_ms(),
                    id
                ],
            )?;

            reload(tx, id)
        })
    }

    /// Soft-delete a live task.
    pub fn delete_task(&self, id: i64) -> Result<Task> {
        self.with_transaction(|tx| {
            let now = now_ms();
            let updated = tx.execute(
                "UPDATE tasks SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, id],
            )?;
            if updated == 0 {
                return Err(AppError::task_not_found(id).into());
            }
            Ok(reload(tx, id)?.task)
        })
    }

    /// Restore a soft-deleted task. Live or unknown ids are not found.
    pub fn restore_task(&self, id: i64) -> Result<TaskWithCategory> {
        self.with_transaction(|tx| {
            let restored = tx.execute(
                "UPDATE tasks SET deleted_at = NULL, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NOT NULL",
                params![now_ms(), id],
            )?;
            if restored == 0 {
                return Err(AppError::task_not_found(id).into());
            }
            reload(tx, id)
        })
    }

    /// Permanently remove a task, live or trashed.
    pub fn force_delete_task(&self, id: i64) -> Result<()> {
        self.with_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(AppError::task_not_found(id).into());
            }
            Ok(())
        })
    }

    /// Get a live task with its category.
    pub fn get_task(&self, id: i64) -> Result<Option<TaskWithCategory>> {
        self.with_conn(|conn| find_task(conn, id, false))
    }

    /// Get a task whether or not it is soft-deleted.
    pub fn get_task_with_trashed(&self, id: i64) -> Result<Option<TaskWithCategory>> {
        self.with_conn(|conn| find_task(conn, id, true))
    }

    /// Filtered, sorted and paginated task listing.
    ///
    /// `page` is 1-based; values below 1 are treated as 1.
    pub fn query_tasks(
        &self,
        filters: &TaskFilters,
        sorting: &TaskSorting,
        page: i64,
        per_page: i64,
    ) -> Result<TaskPage> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        self.with_conn(|conn| {
            let clause = FilterClause::build(filters);

            let count_sql = format!("SELECT COUNT(*) FROM tasks t{}", clause.sql);
            let total: i64 =
                conn.query_row(&count_sql, clause.params_refs().as_slice(), |row| row.get(0))?;

            let sql = format!(
                "{}{} ORDER BY {} LIMIT {} OFFSET {}",
                TASK_SELECT,
                clause.sql,
                sorting.order_clause(),
                per_page,
                (page - 1).saturating_mul(per_page)
            );
            let mut stmt = conn.prepare(&sql)?;
            let data = stmt
                .query_map(clause.params_refs().as_slice(), parse_task_with_category)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let last_page = ((total + per_page - 1) / per_page).max(1);

            Ok(TaskPage {
                data,
                total,
                page,
                per_page,
                last_page,
            })
        })
    }

    /// Up to fifty most recently created live tasks, optionally matching a
    /// search term against title or description.
    pub fn list_recent_light(&self, search: Option<&str>) -> Result<Vec<LightTask>> {
        let filters = TaskFilters {
            search: search.map(str::to_string),
            ..TaskFilters::default()
        };

        self.with_conn(|conn| {
            let clause = FilterClause::build(&filters);
            let sql = format!(
                "SELECT t.id, t.title, t.status, t.priority, t.due_date, t.category_id
                 FROM tasks t{}
                 ORDER BY t.created_at DESC, t.id DESC
                 LIMIT {}",
                clause.sql, LIGHT_LIST_LIMIT
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(clause.params_refs().as_slice(), |row| {
                    Ok(LightTask {
                        id: row.get("id")?,
                        title: row.get("title")?,
                        status: parse_enum(row, "status")?,
                        priority: parse_enum(row, "priority")?,
                        due_date: row.get("due_date")?,
                        category_id: row.get("category_id")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Counters over live tasks. `overdue` counts tasks due strictly before
    /// `today` that are not completed.
    pub fn get_task_statistics(&self, today: NaiveDate) -> Result<TaskStatistics> {
        self.with_conn(|conn| {
            let count = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<i64> {
                Ok(conn.query_row(sql, params, |row| row.get(0))?)
            };

            let total = count("SELECT COUNT(*) FROM tasks WHERE deleted_at IS NULL", &[])?;
            let pending = count(
                "SELECT COUNT(*) FROM tasks WHERE deleted_at IS NULL AND status = 'pending'",
                &[],
            )?;
            let in_progress = count(
                "SELECT COUNT(*) FROM tasks WHERE deleted_at IS NULL AND status = 'in_progress'",
                &[],
            )?;
            let completed = count(
                "SELECT COUNT(*) FROM tasks WHERE deleted_at IS NULL AND status = 'completed'",
                &[],
            )?;
            let overdue = count(
                "SELECT COUNT(*) FROM tasks
                 WHERE deleted_at IS NULL
                   AND status != 'completed'
                   AND due_date IS NOT NULL
                   AND due_date < ?1",
                &[&today],
            )?;

            Ok(TaskStatistics {
                total,
                pending,
                in_progress,
                completed,
                overdue,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrashedMode;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn empty_filters_only_exclude_trashed() {
        let clause = FilterClause::build(&TaskFilters::default());
        assert_eq!(clause.sql, " WHERE t.deleted_at IS NULL");
        assert!(clause.params.is_empty());
    }

    #[test]
    fn with_trashed_and_no_filters_has_no_where() {
        let filters = TaskFilters {
            trashed: TrashedMode::WithTrashed,
            ..TaskFilters::default()
        };
        let clause = FilterClause::build(&filters);
        assert_eq!(clause.sql, "");
    }

    #[test]
    fn blank_search_is_ignored() {
        let filters = TaskFilters {
            search: Some("   ".into()),
            ..TaskFilters::default()
        };
        let clause = FilterClause::build(&filters);
        assert!(clause.params.is_empty());
    }

    #[test]
    fn parameters_are_numbered_in_order() {
        let filters = TaskFilters {
            status: Some(TaskStatus::Pending),
            category_id: Some(3),
            due_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..TaskFilters::default()
        };
        let clause = FilterClause::build(&filters);
        assert_eq!(
            clause.sql,
            " WHERE t.deleted_at IS NULL AND t.status = ?1 AND t.category_id = ?2 AND t.due_date <= ?3"
        );
        assert_eq!(clause.params.len(), 3);
    }
}
