//! Serialized shapes returned by the JSON API and used by the pages.

use crate::types::{
    Category, CategoryRef, CategoryWithCounts, CategoryWithRelations, Priority, TaskPage,
    TaskStatus, TaskWithCategory,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

/// Render epoch milliseconds as RFC 3339 (UTC).
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

impl From<&CategoryRef> for CategorySummary {
    fn from(c: &CategoryRef) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub parent_name: Option<String>,
    pub children: Vec<CategorySummary>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl CategoryView {
    /// A bare row; parent name and children are left empty.
    pub fn from_category(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            parent_id: c.parent_id,
            parent_name: None,
            children: Vec::new(),
            created_at: format_timestamp(c.created_at),
            updated_at: format_timestamp(c.updated_at),
            deleted_at: c.deleted_at.map(format_timestamp),
        }
    }
}

impl From<&CategoryWithRelations> for CategoryView {
    fn from(c: &CategoryWithRelations) -> Self {
        Self {
            parent_name: c.parent.as_ref().map(|p| p.name.clone()),
            children: c.children.iter().map(CategorySummary::from).collect(),
            ..Self::from_category(&c.category)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCountsView {
    #[serde(flatten)]
    pub category: CategoryView,
    pub tasks_total_count: i64,
    pub tasks_pending_count: i64,
    pub tasks_in_progress_count: i64,
    pub tasks_completed_count: i64,
}

impl From<&CategoryWithCounts> for CategoryCountsView {
    fn from(c: &CategoryWithCounts) -> Self {
        Self {
            category: CategoryView::from(&c.category),
            tasks_total_count: c.counts.total,
            tasks_pending_count: c.counts.pending,
            tasks_in_progress_count: c.counts.in_progress,
            tasks_completed_count: c.counts.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub is_overdue: bool,
    pub category: Option<CategorySummary>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl TaskView {
    pub fn new(t: &TaskWithCategory, today: NaiveDate) -> Self {
        let task = &t.task;
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            is_overdue: task.is_overdue(today),
            category: t.category.as_ref().map(|c| CategorySummary {
                id: c.id,
                name: c.name.clone(),
            }),
            created_at: format_timestamp(task.created_at),
            updated_at: format_timestamp(task.updated_at),
            deleted_at: task.deleted_at.map(format_timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPageView {
    pub data: Vec<TaskView>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl TaskPageView {
    pub fn new(page: &TaskPage, today: NaiveDate) -> Self {
        Self {
            data: page.data.iter().map(|t| TaskView::new(t, today)).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            last_page: page.last_page,
        }
    }
}
