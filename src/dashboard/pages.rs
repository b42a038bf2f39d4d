//! Server-rendered HTML pages.
//!
//! Mutations answer with a 303 redirect carrying a `msg` flash; validation
//! failures re-render the form with the submitted values and status 422.

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, warn};

use super::api::status_for;
use super::server::DashboardServer;
use super::templates::{self, Flash, Section};
use super::views::{format_timestamp, html_escape};
use crate::db::today;
use crate::error::{AppError, ErrorKind};
use crate::forms::{CategoryForm, TaskForm, TaskListParams, TaskListQuery};
use crate::types::{
    Category, CategoryStatistics, CategoryWithRelations, Priority, Task, TaskPage,
    TaskStatistics, TaskStatus, TaskWithCategory,
};

/// Application error rendered as an HTML page.
pub struct PageError(AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);
        let heading = match err.kind() {
            ErrorKind::Validation => "Invalid request",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Internal => "Something went wrong",
        };
        if status.is_server_error() {
            error!(code = ?err.code, "Page failed: {}", err.message);
        } else {
            warn!(code = ?err.code, "Page rejected: {}", err.message);
        }
        let body = format!(
            r#"<div class="card"><p>{}</p><p><a href="/tasks">Back to tasks</a></p></div>"#,
            html_escape(&err.message)
        );
        (
            status,
            Html(templates::layout(Section::Tasks, heading, None, &body)),
        )
            .into_response()
    }
}

type PageResult = Result<Response, PageError>;

/// Flash message carried across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct MessageParam {
    msg: Option<String>,
}

impl MessageParam {
    fn flash(&self) -> Option<Flash> {
        self.msg
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(Flash::parse)
    }
}

fn redirect_with(path: &str, flash: Flash) -> Response {
    Redirect::to(&format!("{}?msg={}", path, flash.to_query_value())).into_response()
}

fn page(section: Section, title: &str, flash: Option<&Flash>, content: &str) -> Response {
    Html(templates::layout(section, title, flash, content)).into_response()
}

fn status_badge(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "badge-pending",
        TaskStatus::InProgress => "badge-info",
        TaskStatus::Completed => "badge-success",
    }
}

fn priority_badge(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "badge-pending",
        Priority::Medium => "badge-warning",
        Priority::High => "badge-error",
    }
}

fn selected(is: bool) -> &'static str {
    if is { " selected" } else { "" }
}

/// `<option>`s for a fixed set of values, with an optional leading blank.
fn enum_options<'a>(
    values: impl Iterator<Item = (&'a str, &'a str)>,
    current: Option<&str>,
    blank: Option<&str>,
) -> String {
    let current = current.unwrap_or("");
    let mut html = String::new();
    if let Some(label) = blank {
        html.push_str(&format!(
            r#"<option value=""{}>{}</option>"#,
            selected(current.is_empty()),
            label
        ));
    }
    for (value, label) in values {
        html.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            value,
            selected(current == value),
            label
        ));
    }
    html
}

fn status_options(current: Option<&str>, blank: Option<&str>) -> String {
    enum_options(
        TaskStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
        current,
        blank,
    )
}

fn priority_options(current: Option<&str>, blank: Option<&str>) -> String {
    enum_options(
        Priority::ALL.iter().map(|p| (p.as_str(), p.label())),
        current,
        blank,
    )
}

/// Category `<option>`s in tree order, children indented under their root.
fn category_options(tree: &[CategoryWithRelations], current: Option<&str>) -> String {
    let current = current.unwrap_or("");
    let mut html = String::new();
    for root in tree {
        let id = root.category.id.to_string();
        html.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            id,
            selected(current == id),
            html_escape(&root.category.name)
        ));
        for child in &root.children {
            let id = child.id.to_string();
            html.push_str(&format!(
                r#"<option value="{}"{}>&nbsp;&nbsp;{}</option>"#,
                id,
                selected(current == id),
                html_escape(&child.name)
            ));
        }
    }
    html
}

fn field_error(error: Option<&AppError>, field: &str) -> String {
    match error {
        Some(e) if e.field.as_deref() == Some(field) => {
            format!(r#"<p class="field-error">{}</p>"#, html_escape(&e.message))
        }
        _ => String::new(),
    }
}

/// Top-of-page message for a failed submission.
fn form_flash(error: Option<&AppError>, fields: &[&str]) -> Option<Flash> {
    error.map(|e| match e.field.as_deref() {
        Some(f) if fields.contains(&f) => Flash::error("Please correct the highlighted fields."),
        _ => Flash::error(e.message.clone()),
    })
}

fn format_due(due: Option<NaiveDate>, overdue: bool) -> String {
    match due {
        Some(date) if overdue => format!(r#"<span class="overdue">{} (overdue)</span>"#, date),
        Some(date) => date.to_string(),
        None => r#"<span class="muted">-</span>"#.to_string(),
    }
}

fn post_button(action: &str, label: &str, class: &str, confirm: Option<&str>) -> String {
    let onsubmit = confirm
        .map(|c| format!(r#" onsubmit="return confirm('{}')""#, html_escape(c)))
        .unwrap_or_default();
    format!(
        r#"<form method="post" action="{}"{}><button type="submit" class="{}">{}</button></form>"#,
        action, onsubmit, class, label
    )
}

// ----- task fragments -----

fn task_stats_cards(stats: &TaskStatistics) -> String {
    let cards = [
        (stats.total, "Total"),
        (stats.pending, "Pending"),
        (stats.in_progress, "In progress"),
        (stats.completed, "Completed"),
        (stats.overdue, "Overdue"),
    ];
    let mut html = String::from(r#"<div class="grid-stats">"#);
    for (value, label) in cards {
        html.push_str(&format!(
            r#"<div class="card stat"><div class="stat-value">{}</div><div class="stat-label">{}</div></div>"#,
            value, label
        ));
    }
    html.push_str("</div>");
    html
}

fn task_filter_form(action: &str, raw: &TaskListParams, tree: &[CategoryWithRelations]) -> String {
    let text = |v: &Option<String>| html_escape(v.as_deref().unwrap_or(""));
    let sort_by = enum_options(
        [
            ("created_at", "Created"),
            ("due_date", "Due date"),
            ("priority", "Priority"),
            ("status", "Status"),
            ("title", "Title"),
        ]
        .into_iter(),
        raw.sort_by.as_deref().or(Some("created_at")),
        None,
    );
    let sort_dir = enum_options(
        [("desc", "Descending"), ("asc", "Ascending")].into_iter(),
        raw.sort_dir.as_deref().map(str::to_lowercase).as_deref().or(Some("desc")),
        None,
    );
    let trashed = enum_options(
        [("with_trashed", "Include trashed"), ("only_trashed", "Only trashed")].into_iter(),
        raw.with.as_deref(),
        Some("Active only"),
    );
    let category = if tree.is_empty() {
        String::new()
    } else {
        format!(
            r#"<label>Category<select name="category_id"><option value="">All categories</option>{}</select></label>"#,
            category_options(tree, raw.category_id.as_deref())
        )
    };

    format!(
        r#"<form method="get" action="{action}" class="card form filters">
    <label>Search<input name="search" value="{search}" placeholder="Title or description"></label>
    <label>Status<select name="status">{status}</select></label>
    <label>Priority<select name="priority">{priority}</select></label>
    {category}
    <label>Due from<input type="date" name="due_from" value="{due_from}"></label>
    <label>Due to<input type="date" name="due_to" value="{due_to}"></label>
    <label>Show<select name="with">{trashed}</select></label>
    <label>Sort by<select name="sort_by">{sort_by}</select></label>
    <label>Direction<select name="sort_dir">{sort_dir}</select></label>
    <div class="actions"><button type="submit">Filter</button><a href="{action}">Reset</a></div>
</form>"#,
        action = action,
        search = text(&raw.search),
        status = status_options(raw.status.as_deref(), Some("All statuses")),
        priority = priority_options(raw.priority.as_deref(), Some("All priorities")),
        category = category,
        due_from = text(&raw.due_from),
        due_to = text(&raw.due_to),
        trashed = trashed,
        sort_by = sort_by,
        sort_dir = sort_dir,
    )
}

fn task_table(tasks: &[TaskWithCategory], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return r#"<div class="card empty-state">No tasks found</div>"#.to_string();
    }

    let mut html = String::from(
        r#"<div class="card"><table><thead><tr><th>Title</th><th>Status</th><th>Priority</th><th>Due</th><th>Category</th></tr></thead><tbody>"#,
    );
    for t in tasks {
        let task = &t.task;
        let trashed = if task.is_trashed() {
            r#" <span class="badge badge-error">trashed</span>"#
        } else {
            ""
        };
        let category = t
            .category
            .as_ref()
            .map(|c| format!(r#"<a href="/categories/{}">{}</a>"#, c.id, html_escape(&c.name)))
            .unwrap_or_else(|| r#"<span class="muted">-</span>"#.to_string());
        html.push_str(&format!(
            r#"<tr><td><a href="/tasks/{id}">{title}</a>{trashed}</td><td><span class="badge {sb}">{status}</span></td><td><span class="badge {pb}">{priority}</span></td><td>{due}</td><td>{category}</td></tr>"#,
            id = task.id,
            title = html_escape(&task.title),
            trashed = trashed,
            sb = status_badge(task.status),
            status = task.status.label(),
            pb = priority_badge(task.priority),
            priority = task.priority.label(),
            due = format_due(task.due_date, task.is_overdue(today)),
            category = category,
        ));
    }
    html.push_str("</tbody></table></div>");
    html
}

fn pagination(base: &str, query: &TaskListQuery, page: &TaskPage) -> String {
    let mut html = String::from(r#"<div class="pagination">"#);
    if page.page > 1 {
        html.push_str(&format!(
            r#"<a href="{}?{}">&laquo; Previous</a>"#,
            base,
            html_escape(&query.to_query_string(page.page - 1))
        ));
    }
    html.push_str(&format!(
        r#"<span class="muted">Page {} of {} ({} tasks)</span>"#,
        page.page, page.last_page, page.total
    ));
    if page.page < page.last_page {
        html.push_str(&format!(
            r#"<a href="{}?{}">Next &raquo;</a>"#,
            base,
            html_escape(&query.to_query_string(page.page + 1))
        ));
    }
    html.push_str("</div>");
    html
}

fn task_form_values(task: &Task) -> TaskForm {
    TaskForm {
        title: Some(task.title.clone()),
        description: task.description.clone(),
        status: Some(task.status.as_str().to_string()),
        priority: Some(task.priority.as_str().to_string()),
        due_date: task.due_date.map(|d| d.to_string()),
        category_id: task.category_id.map(|id| id.to_string()),
    }
}

const TASK_FIELDS: &[&str] = &[
    "title",
    "description",
    "status",
    "priority",
    "due_date",
    "category_id",
];

/// Render the task form; status 422 when re-rendering after a failure.
fn task_form_page(
    state: &DashboardServer,
    task_id: Option<i64>,
    form: &TaskForm,
    error: Option<&AppError>,
) -> PageResult {
    let tree = state.services().categories.tree()?;
    let (title, action, submit, cancel) = match task_id {
        Some(id) => (
            "Edit task".to_string(),
            format!("/tasks/{}", id),
            "Save changes",
            format!("/tasks/{}", id),
        ),
        None => (
            "New task".to_string(),
            "/tasks".to_string(),
            "Create task",
            "/tasks".to_string(),
        ),
    };
    let text = |v: &Option<String>| html_escape(v.as_deref().unwrap_or(""));

    let content = templates::render(
        templates::TASK_FORM_TEMPLATE,
        &[
            ("action", &action),
            ("title", &text(&form.title)),
            ("title_error", &field_error(error, "title")),
            ("description", &text(&form.description)),
            ("status_options", &status_options(form.status.as_deref(), None)),
            ("status_error", &field_error(error, "status")),
            ("priority_options", &priority_options(form.priority.as_deref(), None)),
            ("priority_error", &field_error(error, "priority")),
            ("due_date", &text(&form.due_date)),
            ("due_date_error", &field_error(error, "due_date")),
            ("category_options", &category_options(&tree, form.category_id.as_deref())),
            ("category_id_error", &field_error(error, "category_id")),
            ("submit_label", submit),
            ("cancel_url", &cancel),
        ],
    );

    let flash = form_flash(error, TASK_FIELDS);
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    Ok((status, page(Section::Tasks, &title, flash.as_ref(), &content)).into_response())
}

// ----- task pages -----

pub async fn root() -> Redirect {
    Redirect::to("/tasks")
}

pub async fn tasks_index(
    State(state): State<DashboardServer>,
    Query(params): Query<TaskListParams>,
    Query(message): Query<MessageParam>,
) -> PageResult {
    let services = state.services();
    let query = params.clone().parse(state.page_size())?;
    let tasks = services.task_queries.get_all_tasks(
        &query.filters,
        &query.sorting,
        query.page,
        query.per_page,
    )?;
    let stats = services.task_queries.get_task_statistics()?;
    let tree = services.categories.tree()?;

    let mut content = task_stats_cards(&stats);
    content.push_str(r#"<div class="actions"><a href="/tasks/new">+ New task</a></div>"#);
    content.push_str(&task_filter_form("/tasks", &params, &tree));
    content.push_str(&task_table(&tasks.data, today()));
    content.push_str(&pagination("/tasks", &query, &tasks));

    Ok(page(Section::Tasks, "Tasks", message.flash().as_ref(), &content))
}

pub async fn tasks_create(State(state): State<DashboardServer>) -> PageResult {
    let form = TaskForm {
        status: Some(TaskStatus::Pending.as_str().to_string()),
        priority: Some(Priority::Medium.as_str().to_string()),
        ..TaskForm::default()
    };
    task_form_page(&state, None, &form, None)
}

pub async fn tasks_store(
    State(state): State<DashboardServer>,
    Form(form): Form<TaskForm>,
) -> PageResult {
    let result = form
        .clone()
        .validate()
        .and_then(|input| state.services().tasks.create(&input));
    match result {
        Ok(task) => Ok(redirect_with(
            "/tasks",
            Flash::success(format!("Task \"{}\" created.", task.task.title)),
        )),
        Err(e) if e.is_validation() => task_form_page(&state, None, &form, Some(&e)),
        Err(e) => Err(e.into()),
    }
}

pub async fn tasks_show(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Query(message): Query<MessageParam>,
) -> PageResult {
    let t = state.services().task_queries.get_task_with_trashed(id)?;
    let task = &t.task;
    let today = today();

    let category = t
        .category
        .as_ref()
        .map(|c| format!(r#"<a href="/categories/{}">{}</a>"#, c.id, html_escape(&c.name)))
        .unwrap_or_else(|| "-".to_string());
    let description = task
        .description
        .as_deref()
        .map(html_escape)
        .unwrap_or_else(|| r#"<span class="muted">No description</span>"#.to_string());
    let deleted = task
        .deleted_at
        .map(|ms| format!("<tr><th>Deleted</th><td>{}</td></tr>", format_timestamp(ms)))
        .unwrap_or_default();

    let actions = if task.is_trashed() {
        format!(
            "{}{}",
            post_button(&format!("/tasks/{}/restore", id), "Restore", "", None),
            post_button(
                &format!("/tasks/{}/force-delete", id),
                "Delete permanently",
                "",
                Some("Permanently delete this task?"),
            )
        )
    } else {
        format!(
            r#"<a href="/tasks/{}/edit">Edit</a>{}"#,
            id,
            post_button(
                &format!("/tasks/{}/delete", id),
                "Move to trash",
                "secondary",
                Some("Move this task to the trash?"),
            )
        )
    };

    let content = format!(
        r#"<div class="card">
    <table>
        <tr><th>Status</th><td><span class="badge {sb}">{status}</span></td></tr>
        <tr><th>Priority</th><td><span class="badge {pb}">{priority}</span></td></tr>
        <tr><th>Due date</th><td>{due}</td></tr>
        <tr><th>Category</th><td>{category}</td></tr>
        <tr><th>Created</th><td>{created}</td></tr>
        <tr><th>Updated</th><td>{updated}</td></tr>
        {deleted}
    </table>
    <p>{description}</p>
    <div class="actions">{actions}<a href="/tasks">Back to tasks</a></div>
</div>"#,
        sb = status_badge(task.status),
        status = task.status.label(),
        pb = priority_badge(task.priority),
        priority = task.priority.label(),
        due = format_due(task.due_date, task.is_overdue(today)),
        category = category,
        created = format_timestamp(task.created_at),
        updated = format_timestamp(task.updated_at),
        deleted = deleted,
        description = description,
        actions = actions,
    );

    Ok(page(Section::Tasks, &task.title, message.flash().as_ref(), &content))
}

pub async fn tasks_edit(State(state): State<DashboardServer>, Path(id): Path<i64>) -> PageResult {
    let task = state.services().task_queries.get_task_by_id(id)?;
    task_form_page(&state, Some(id), &task_form_values(&task.task), None)
}

pub async fn tasks_update(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Form(form): Form<TaskForm>,
) -> PageResult {
    let result = form
        .clone()
        .validate()
        .and_then(|input| state.services().tasks.update(id, &input));
    match result {
        Ok(_) => Ok(redirect_with("/tasks", Flash::success("Task updated."))),
        Err(e) if e.is_validation() => task_form_page(&state, Some(id), &form, Some(&e)),
        Err(e) => Err(e.into()),
    }
}

pub async fn tasks_delete(State(state): State<DashboardServer>, Path(id): Path<i64>) -> PageResult {
    state.services().tasks.delete(id)?;
    Ok(redirect_with("/tasks", Flash::success("Task moved to trash.")))
}

pub async fn tasks_restore(State(state): State<DashboardServer>, Path(id): Path<i64>) -> PageResult {
    state.services().tasks.restore(id)?;
    Ok(redirect_with("/tasks", Flash::success("Task restored.")))
}

pub async fn tasks_force_delete(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> PageResult {
    state.services().tasks.force_delete(id)?;
    Ok(redirect_with("/tasks", Flash::success("Task permanently deleted.")))
}

// ----- category pages -----

const CATEGORY_FIELDS: &[&str] = &["name", "parent_id"];

fn category_form_values(category: &Category) -> CategoryForm {
    CategoryForm {
        name: Some(category.name.clone()),
        parent_id: category.parent_id.map(|id| id.to_string()),
    }
}

fn category_form_page(
    state: &DashboardServer,
    category_id: Option<i64>,
    form: &CategoryForm,
    error: Option<&AppError>,
) -> PageResult {
    // Only roots can be parents; a category cannot be its own parent
    let roots: Vec<Category> = state
        .services()
        .categories
        .roots()?
        .into_iter()
        .filter(|c| Some(c.id) != category_id)
        .collect();
    let current = form.parent_id.as_deref().unwrap_or("");
    let parent_options: String = roots
        .iter()
        .map(|c| {
            let id = c.id.to_string();
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                id,
                selected(current == id),
                html_escape(&c.name)
            )
        })
        .collect();

    let (title, action, submit, cancel) = match category_id {
        Some(id) => (
            "Edit category",
            format!("/categories/{}", id),
            "Save changes",
            format!("/categories/{}", id),
        ),
        None => (
            "New category",
            "/categories".to_string(),
            "Create category",
            "/categories".to_string(),
        ),
    };

    let content = templates::render(
        templates::CATEGORY_FORM_TEMPLATE,
        &[
            ("action", &action),
            ("name", &html_escape(form.name.as_deref().unwrap_or(""))),
            ("name_error", &field_error(error, "name")),
            ("parent_options", &parent_options),
            ("parent_id_error", &field_error(error, "parent_id")),
            ("submit_label", submit),
            ("cancel_url", &cancel),
        ],
    );

    let flash = form_flash(error, CATEGORY_FIELDS);
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    Ok((status, page(Section::Categories, title, flash.as_ref(), &content)).into_response())
}

pub async fn categories_index(
    State(state): State<DashboardServer>,
    Query(message): Query<MessageParam>,
) -> PageResult {
    let services = state.services();
    let rows = services.categories.with_counts()?;
    let trashed = services.categories.trashed()?;

    let mut content =
        String::from(r#"<div class="actions"><a href="/categories/new">+ New category</a></div>"#);

    if rows.is_empty() {
        content.push_str(r#"<div class="card empty-state">No categories yet</div>"#);
    } else {
        content.push_str(
            r#"<div class="card"><table><thead><tr><th>Name</th><th>Parent</th><th>Subcategories</th><th>Tasks</th><th>Pending</th><th>In progress</th><th>Completed</th></tr></thead><tbody>"#,
        );
        for row in &rows {
            let c = &row.category;
            let parent = c
                .parent
                .as_ref()
                .map(|p| format!(r#"<a href="/categories/{}">{}</a>"#, p.id, html_escape(&p.name)))
                .unwrap_or_else(|| "-".to_string());
            content.push_str(&format!(
                r#"<tr><td><a href="/categories/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                c.category.id,
                html_escape(&c.category.name),
                parent,
                c.children.len(),
                row.counts.total,
                row.counts.pending,
                row.counts.in_progress,
                row.counts.completed,
            ));
        }
        content.push_str("</tbody></table></div>");
    }

    if !trashed.is_empty() {
        content.push_str(r#"<h2>Trash</h2><div class="card"><table><thead><tr><th>Name</th><th>Deleted</th><th></th></tr></thead><tbody>"#);
        for c in &trashed {
            content.push_str(&format!(
                r#"<tr><td>{}</td><td>{}</td><td class="actions">{}{}</td></tr>"#,
                html_escape(&c.name),
                c.deleted_at.map(format_timestamp).unwrap_or_default(),
                post_button(&format!("/categories/{}/restore", c.id), "Restore", "", None),
                post_button(
                    &format!("/categories/{}/force-delete", c.id),
                    "Delete permanently",
                    "secondary",
                    Some("Permanently delete this category?"),
                ),
            ));
        }
        content.push_str("</tbody></table></div>");
    }

    Ok(page(Section::Categories, "Categories", message.flash().as_ref(), &content))
}

fn statistics_table(stats: &CategoryStatistics) -> String {
    if stats.stats.is_empty() {
        return r#"<div class="card empty-state">No categories yet</div>"#.to_string();
    }
    let mut html = String::from(
        r#"<div class="card"><table><thead><tr><th>Category</th><th>Total</th><th>Pending</th><th>In progress</th><th>Completed</th></tr></thead><tbody>"#,
    );
    for row in &stats.stats {
        let indent = if row.parent_id.is_some() { "&nbsp;&nbsp;" } else { "" };
        html.push_str(&format!(
            r#"<tr><td>{}<a href="/categories/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            indent,
            row.id,
            html_escape(&row.name),
            row.tasks_total_count,
            row.tasks_pending_count,
            row.tasks_in_progress_count,
            row.tasks_completed_count,
        ));
    }
    let t = &stats.totals;
    html.push_str(&format!(
        r#"</tbody><tfoot><tr><th>Total</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr></tfoot></table></div>"#,
        t.total, t.pending, t.in_progress, t.completed
    ));
    html
}

pub async fn categories_statistics(State(state): State<DashboardServer>) -> PageResult {
    let stats = state.services().categories.statistics()?;
    Ok(page(
        Section::Statistics,
        "Category statistics",
        None,
        &statistics_table(&stats),
    ))
}

pub async fn categories_create(State(state): State<DashboardServer>) -> PageResult {
    category_form_page(&state, None, &CategoryForm::default(), None)
}

pub async fn categories_store(
    State(state): State<DashboardServer>,
    Form(form): Form<CategoryForm>,
) -> PageResult {
    let result = form
        .clone()
        .validate()
        .and_then(|input| state.services().categories.create(&input));
    match result {
        Ok(category) => Ok(redirect_with(
            "/categories",
            Flash::success(format!("Category \"{}\" created.", category.category.name)),
        )),
        Err(e) if e.is_validation() => category_form_page(&state, None, &form, Some(&e)),
        Err(e) => Err(e.into()),
    }
}

pub async fn categories_show(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Query(params): Query<TaskListParams>,
    Query(message): Query<MessageParam>,
) -> PageResult {
    let services = state.services();
    let category = services.categories.get(id)?;
    let query = params.clone().parse(state.page_size())?;
    let tasks = services.task_queries.get_tasks_by_category(
        id,
        &query.filters,
        &query.sorting,
        query.page,
        query.per_page,
    )?;

    let parent = category
        .parent
        .as_ref()
        .map(|p| format!(r#"<a href="/categories/{}">{}</a>"#, p.id, html_escape(&p.name)))
        .unwrap_or_else(|| "-".to_string());
    let children = if category.children.is_empty() {
        "-".to_string()
    } else {
        category
            .children
            .iter()
            .map(|c| format!(r#"<a href="/categories/{}">{}</a>"#, c.id, html_escape(&c.name)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let base = format!("/categories/{}", id);
    let mut content = format!(
        r#"<div class="card">
    <table>
        <tr><th>Parent</th><td>{parent}</td></tr>
        <tr><th>Subcategories</th><td>{children}</td></tr>
        <tr><th>Created</th><td>{created}</td></tr>
    </table>
    <div class="actions"><a href="/categories/{id}/edit">Edit</a>{delete}<a href="/categories">Back to categories</a></div>
</div>"#,
        parent = parent,
        children = children,
        created = format_timestamp(category.category.created_at),
        id = id,
        delete = post_button(
            &format!("/categories/{}/delete", id),
            "Move to trash",
            "secondary",
            Some("Move this category to the trash?"),
        ),
    );
    content.push_str("<h2>Tasks</h2>");
    content.push_str(&task_table(&tasks.data, today()));
    content.push_str(&pagination(&base, &query, &tasks));

    Ok(page(
        Section::Categories,
        &category.category.name,
        message.flash().as_ref(),
        &content,
    ))
}

pub async fn categories_edit(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> PageResult {
    let category = state.services().categories.get(id)?;
    category_form_page(&state, Some(id), &category_form_values(&category.category), None)
}

pub async fn categories_update(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> PageResult {
    let result = form
        .clone()
        .validate()
        .and_then(|input| state.services().categories.update(id, &input));
    match result {
        Ok(_) => Ok(redirect_with("/categories", Flash::success("Category updated."))),
        Err(e) if e.is_validation() => category_form_page(&state, Some(id), &form, Some(&e)),
        Err(e) => Err(e.into()),
    }
}

pub async fn categories_delete(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> PageResult {
    state.services().categories.delete(id)?;
    Ok(redirect_with("/categories", Flash::success("Category moved to trash.")))
}

pub async fn categories_restore(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> PageResult {
    state.services().categories.restore(id)?;
    Ok(redirect_with("/categories", Flash::success("Category restored.")))
}

pub async fn categories_force_delete(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> PageResult {
    state.services().categories.force_delete(id)?;
    Ok(redirect_with("/categories", Flash::success("Category permanently deleted.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_mark_current_value() {
        let html = status_options(Some("in_progress"), Some("All statuses"));
        assert!(html.starts_with(r#"<option value="">All statuses</option>"#));
        assert!(html.contains(r#"<option value="in_progress" selected>In progress</option>"#));
        assert!(!html.contains(r#"value="pending" selected"#));
    }

    #[test]
    fn field_errors_only_for_matching_field() {
        let err = AppError::missing_field("title", "Title is required.");
        assert!(field_error(Some(&err), "title").contains("Title is required."));
        assert!(field_error(Some(&err), "status").is_empty());
        assert!(field_error(None, "title").is_empty());
    }

    #[test]
    fn unknown_field_errors_surface_as_flash() {
        let err = AppError::category_cycle();
        let flash = form_flash(Some(&err), &["name"]).unwrap();
        assert!(!flash.success);
        assert_eq!(flash.text, err.message);

        let flash = form_flash(Some(&err), CATEGORY_FIELDS).unwrap();
        assert_eq!(flash.text, "Please correct the highlighted fields.");
    }

    #[test]
    fn overdue_due_dates_are_highlighted() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert!(format_due(date, true).contains("overdue"));
        assert_eq!(format_due(date, false), "2024-01-05");
    }
}
