//! Request payloads and their validation into typed inputs.
//!
//! HTML forms submit every field as text, so each payload has a form variant
//! whose ids are strings; both end in the same `validate`.

use crate::error::AppError;
use crate::types::{
    CategoryInput, Priority, SortDir, SortField, TaskFilters, TaskInput, TaskSorting,
    TaskStatus, TrashedMode,
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maximum length of names and titles, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Upper bound on page size requested by clients.
pub const MAX_PER_PAGE: i64 = 100;

/// Highest page number accepted; keeps the row offset within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Trim a submitted string, mapping blanks to `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id(field: &str, value: Option<String>, message: &str) -> Result<Option<i64>, AppError> {
    match clean(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::invalid_value(field, message)),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its date part is kept).
pub fn parse_date(field: &str, value: Option<String>, message: &str) -> Result<Option<NaiveDate>, AppError> {
    match clean(value) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.date_naive()))
            .map(Some)
            .map_err(|_| AppError::invalid_value(field, message)),
    }
}

fn required_name(field: &str, value: Option<String>, label: &str) -> Result<String, AppError> {
    let Some(value) = clean(value) else {
        return Err(AppError::missing_field(field, &format!("{} is required.", label)));
    };
    if value.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid_value(
            field,
            &format!("{} must be at most {} characters.", label, MAX_NAME_LEN),
        ));
    }
    Ok(value)
}

/// JSON body for creating or updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub parent_id: Option<i64>,
}

impl CategoryPayload {
    pub fn validate(self) -> Result<CategoryInput, AppError> {
        Ok(CategoryInput {
            name: required_name("name", self.name, "Name")?,
            parent_id: self.parent_id,
        })
    }
}

/// HTML form body for a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

impl CategoryForm {
    pub fn validate(self) -> Result<CategoryInput, AppError> {
        let parent_id = parse_id(
            "parent_id",
            self.parent_id,
            "Parent category must be a valid ID.",
        )?;
        CategoryPayload {
            name: self.name,
            parent_id,
        }
        .validate()
    }
}

/// JSON body for creating or updating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub category_id: Option<i64>,
}

impl TaskPayload {
    pub fn validate(self) -> Result<TaskInput, AppError> {
        let title = required_name("title", self.title, "Title")?;
        let description = clean(self.description);

        let status = match clean(self.status) {
            None => return Err(AppError::missing_field("status", "Status is required.")),
            Some(raw) => raw
                .parse::<TaskStatus>()
                .map_err(|_| AppError::invalid_value("status", "Invalid status value."))?,
        };

        let priority = match clean(self.priority) {
            None => return Err(AppError::missing_field("priority", "Priority is required.")),
            Some(raw) => raw
                .parse::<Priority>()
                .map_err(|_| AppError::invalid_value("priority", "Invalid priority value."))?,
        };

        let due_date = parse_date("due_date", self.due_date, "Due date must be a valid date.")?;

        Ok(TaskInput {
            title,
            description,
            status,
            priority,
            due_date,
            category_id: self.category_id,
        })
    }
}

/// HTML form body for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub category_id: Option<String>,
}

impl TaskForm {
    pub fn validate(self) -> Result<TaskInput, AppError> {
        let category_id = parse_id("category_id", self.category_id, "Selected category is invalid.")?;
        TaskPayload {
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            category_id,
        }
        .validate()
    }
}

/// Query string of the task listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<String>,
    pub search: Option<String>,
    pub due_from: Option<String>,
    pub due_to: Option<String>,
    /// Trashed mode: `with_trashed`, `only_trashed`, anything else = default.
    pub with: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Parsed task listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskListQuery {
    pub filters: TaskFilters,
    pub sorting: TaskSorting,
    pub page: i64,
    pub per_page: i64,
}

impl TaskListParams {
    /// Parse into typed filters. Unknown sort fields, directions and trashed
    /// modes fall back to their defaults; malformed filter values are
    /// validation errors.
    pub fn parse(self, default_per_page: i64) -> Result<TaskListQuery, AppError> {
        let status = clean(self.status)
            .map(|raw| raw.parse::<TaskStatus>())
            .transpose()
            .map_err(|_| AppError::invalid_value("status", "Invalid status value."))?;

        let priority = clean(self.priority)
            .map(|raw| raw.parse::<Priority>())
            .transpose()
            .map_err(|_| AppError::invalid_value("priority", "Invalid priority value."))?;

        let category_id = parse_id("category_id", self.category_id, "Selected category is invalid.")?;
        let due_from = parse_date("due_from", self.due_from, "Due from must be a valid date.")?;
        let due_to = parse_date("due_to", self.due_to, "Due to must be a valid date.")?;

        let page = clean(self.page)
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE);
        let per_page = clean(self.per_page)
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);

        Ok(TaskListQuery {
            filters: TaskFilters {
                status,
                priority,
                category_id,
                search: clean(self.search),
                due_from,
                due_to,
                trashed: TrashedMode::parse(self.with.as_deref()),
            },
            sorting: TaskSorting::new(
                SortField::parse(self.sort_by.as_deref()),
                SortDir::parse(self.sort_dir.as_deref()),
            ),
            page,
            per_page,
        })
    }
}

impl TaskListQuery {
    /// Query string reproducing these filters for the given page.
    pub fn to_query_string(&self, page: i64) -> String {
        let f = &self.filters;
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(status) = f.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = f.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(category_id) = f.category_id {
            pairs.push(("category_id", category_id.to_string()));
        }
        if let Some(search) = &f.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(from) = f.due_from {
            pairs.push(("due_from", from.to_string()));
        }
        if let Some(to) = f.due_to {
            pairs.push(("due_to", to.to_string()));
        }
        if f.trashed != TrashedMode::Default {
            pairs.push(("with", f.trashed.as_str().to_string()));
        }
        pairs.push(("sort_by", self.sorting.sort_by.as_str().to_string()));
        pairs.push(("sort_dir", self.sorting.sort_dir.as_str().to_string()));
        pairs.push(("page", page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));

        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
