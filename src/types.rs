//! Core types for taskdeck.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Ordinal used for sorting: pending < in_progress < completed.
    pub fn rank(&self) -> i32 {
        match self {
            TaskStatus::Pending => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Completed => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Ordinal used for sorting: low < medium < high.
    pub fn rank(&self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// Soft-delete visibility policy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashedMode {
    /// Exclude soft-deleted rows.
    #[default]
    Default,
    /// Include soft-deleted rows.
    WithTrashed,
    /// Only soft-deleted rows.
    OnlyTrashed,
}

impl TrashedMode {
    /// Parse a query-string value. Anything unrecognized selects `Default`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("with_trashed") => TrashedMode::WithTrashed,
            Some("only_trashed") => TrashedMode::OnlyTrashed,
            _ => TrashedMode::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrashedMode::Default => "",
            TrashedMode::WithTrashed => "with_trashed",
            TrashedMode::OnlyTrashed => "only_trashed",
        }
    }

    /// SQL predicate on `deleted_at` for the given table alias.
    pub fn predicate(&self, alias: &str) -> Option<String> {
        match self {
            TrashedMode::Default => Some(format!("{}.deleted_at IS NULL", alias)),
            TrashedMode::WithTrashed => None,
            TrashedMode::OnlyTrashed => Some(format!("{}.deleted_at IS NOT NULL", alias)),
        }
    }
}

/// Allowed task sort fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl SortField {
    /// Parse a query-string value, falling back to `created_at`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("due_date") => SortField::DueDate,
            Some("priority") => SortField::Priority,
            Some("status") => SortField::Status,
            Some("title") => SortField::Title,
            _ => SortField::CreatedAt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::DueDate => "due_date",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::Title => "title",
        }
    }

    /// SQL expression to order by. Enum columns map through their ordinal.
    pub fn sql_expr(&self) -> String {
        match self {
            SortField::CreatedAt => "t.created_at".to_string(),
            SortField::DueDate => "t.due_date".to_string(),
            SortField::Title => "t.title".to_string(),
            SortField::Priority => rank_case(
                "t.priority",
                Priority::ALL.iter().map(|p| (p.as_str(), p.rank())),
            ),
            SortField::Status => rank_case(
                "t.status",
                TaskStatus::ALL.iter().map(|s| (s.as_str(), s.rank())),
            ),
        }
    }
}

/// Build `CASE col WHEN 'a' THEN 1 ... ELSE n END` from an ordinal mapping.
fn rank_case<'a>(column: &str, ranks: impl Iterator<Item = (&'a str, i32)>) -> String {
    let mut expr = format!("CASE {}", column);
    let mut max = 0;
    for (value, rank) in ranks {
        expr.push_str(&format!(" WHEN '{}' THEN {}", value, rank));
        max = max.max(rank);
    }
    expr.push_str(&format!(" ELSE {} END", max + 1));
    expr
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    /// Parse case-insensitively; anything but `asc` is descending.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("asc") => SortDir::Asc,
            _ => SortDir::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Task list filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    #[serde(default)]
    pub trashed: TrashedMode,
}

/// Task list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSorting {
    pub sort_by: SortField,
    pub sort_dir: SortDir,
}

impl TaskSorting {
    pub fn new(sort_by: SortField, sort_dir: SortDir) -> Self {
        Self { sort_by, sort_dir }
    }

    /// Full ORDER BY clause including the id tie-break. Tasks without a due
    /// date sort after dated ones ascending and before them descending.
    pub fn order_clause(&self) -> String {
        if self.sort_by == SortField::DueDate {
            let dir = self.sort_dir.sql();
            return format!("t.due_date IS NULL {dir}, t.due_date {dir}, t.id DESC");
        }
        format!(
            "{} {}, t.id DESC",
            self.sort_by.sql_expr(),
            self.sort_dir.sql()
        )
    }
}

/// A category row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Minimal category reference used for parent/children relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// A category with its parent and live children loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithRelations {
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<CategoryRef>,
    pub children: Vec<CategoryRef>,
}

/// Per-status task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl TaskCounts {
    pub fn add(&mut self, other: &TaskCounts) {
        self.total += other.total;
        self.pending += other.pending;
        self.in_progress += other.in_progress;
        self.completed += other.completed;
    }
}

/// A category with relations and its task counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithCounts {
    #[serde(flatten)]
    pub category: CategoryWithRelations,
    pub counts: TaskCounts,
}

/// One row of the category statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStatsRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub tasks_total_count: i64,
    pub tasks_pending_count: i64,
    pub tasks_in_progress_count: i64,
    pub tasks_completed_count: i64,
}

impl CategoryStatsRow {
    pub fn counts(&self) -> TaskCounts {
        TaskCounts {
            total: self.tasks_total_count,
            pending: self.tasks_pending_count,
            in_progress: self.tasks_in_progress_count,
            completed: self.tasks_completed_count,
        }
    }
}

/// Category statistics: per-category rows plus column totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStatistics {
    pub stats: Vec<CategoryStatsRow>,
    pub totals: TaskCounts,
}

impl CategoryStatistics {
    pub fn from_rows(stats: Vec<CategoryStatsRow>) -> Self {
        let mut totals = TaskCounts::default();
        for row in &stats {
            totals.add(&row.counts());
        }
        Self { stats, totals }
    }
}

/// A task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Task {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Due strictly before `today`, not completed and not soft-deleted.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_trashed()
            && self.status != TaskStatus::Completed
            && self.due_date.is_some_and(|due| due < today)
    }
}

/// Category name attached to a task listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCategory {
    pub id: i64,
    pub name: String,
}

/// A task with its (live) category loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWithCategory {
    #[serde(flatten)]
    pub task: Task,
    pub category: Option<TaskCategory>,
}

/// One page of a task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub data: Vec<TaskWithCategory>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

/// Lightweight task projection for pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightTask {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
}

/// Global task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
}

/// Validated input for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Validated input for creating or updating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trashed_mode_defaults_on_unknown_values() {
        assert_eq!(TrashedMode::parse(None), TrashedMode::Default);
        assert_eq!(TrashedMode::parse(Some("")), TrashedMode::Default);
        assert_eq!(TrashedMode::parse(Some("everything")), TrashedMode::Default);
        assert_eq!(TrashedMode::parse(Some("with_trashed")), TrashedMode::WithTrashed);
        assert_eq!(TrashedMode::parse(Some("only_trashed")), TrashedMode::OnlyTrashed);
    }

    #[test]
    fn sort_field_falls_back_to_created_at() {
        assert_eq!(SortField::parse(Some("id; DROP TABLE tasks")), SortField::CreatedAt);
        assert_eq!(SortField::parse(Some("priority")), SortField::Priority);
        assert_eq!(SortField::parse(None), SortField::CreatedAt);
    }

    #[test]
    fn sort_dir_is_case_insensitive_and_defaults_desc() {
        assert_eq!(SortDir::parse(Some("ASC")), SortDir::Asc);
        assert_eq!(SortDir::parse(Some("up")), SortDir::Desc);
        assert_eq!(SortDir::parse(None), SortDir::Desc);
    }

    #[test]
    fn priority_order_uses_rank_not_lexical() {
        let mut items = vec![Priority::High, Priority::Low, Priority::Medium];
        items.sort_by_key(|p| p.rank());
        assert_eq!(items, vec![Priority::Low, Priority::Medium, Priority::High]);
    }

    #[test]
    fn priority_sort_expression_ranks_every_variant() {
        let expr = SortField::Priority.sql_expr();
        assert_eq!(
            expr,
            "CASE t.priority WHEN 'low' THEN 1 WHEN 'medium' THEN 2 WHEN 'high' THEN 3 ELSE 4 END"
        );
    }

    #[test]
    fn order_clause_appends_id_tiebreak() {
        let sorting = TaskSorting::default();
        assert_eq!(sorting.order_clause(), "t.created_at DESC, t.id DESC");

        let by_due = TaskSorting::new(SortField::DueDate, SortDir::Asc);
        assert_eq!(
            by_due.order_clause(),
            "t.due_date IS NULL ASC, t.due_date ASC, t.id DESC"
        );
    }

    #[test]
    fn overdue_ignores_completed_and_trashed() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut task = Task {
            id: 1,
            title: "t".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Low,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 31),
            category_id: None,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        };
        assert!(task.is_overdue(today));

        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(today));

        task.status = TaskStatus::InProgress;
        task.deleted_at = Some(1);
        assert!(!task.is_overdue(today));

        task.deleted_at = None;
        task.due_date = Some(today);
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn statistics_totals_sum_columns() {
        let row = |id, total, pending, in_progress, completed| CategoryStatsRow {
            id,
            name: format!("c{}", id),
            parent_id: None,
            tasks_total_count: total,
            tasks_pending_count: pending,
            tasks_in_progress_count: in_progress,
            tasks_completed_count: completed,
        };
        let stats = CategoryStatistics::from_rows(vec![row(1, 3, 1, 1, 1), row(2, 2, 2, 0, 0)]);
        assert_eq!(
            stats.totals,
            TaskCounts {
                total: 5,
                pending: 3,
                in_progress: 1,
                completed: 1
            }
        );
    }
}
