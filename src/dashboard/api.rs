//! JSON API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::server::DashboardServer;
use super::views::{CategoryCountsView, CategoryView, TaskPageView, TaskView};
use crate::db::today;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::forms::{CategoryPayload, TaskListParams, TaskPayload};
use crate::types::{CategoryStatistics, LightTask, TaskStatistics, TrashedMode};

/// HTTP status for an application error.
pub fn status_for(err: &AppError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(code = ?self.code, "Request failed: {}", self.message);
        } else {
            warn!(code = ?self.code, field = ?self.field, "Request rejected: {}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `?with=with_trashed|only_trashed` on single-entity lookups.
#[derive(Debug, Default, Deserialize)]
pub struct TrashedParam {
    with: Option<String>,
}

impl TrashedParam {
    fn includes_trashed(&self) -> bool {
        TrashedMode::parse(self.with.as_deref()) != TrashedMode::Default
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LightParams {
    search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListParams {
    tree: Option<String>,
}

// ----- tasks -----

pub async fn list_tasks(
    State(state): State<DashboardServer>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<TaskPageView>> {
    let query = params.parse(state.page_size())?;
    let page = state.services().task_queries.get_all_tasks(
        &query.filters,
        &query.sorting,
        query.page,
        query.per_page,
    )?;
    Ok(Json(TaskPageView::new(&page, today())))
}

pub async fn create_task(
    State(state): State<DashboardServer>,
    Json(payload): Json<TaskPayload>,
) -> AppResult<(StatusCode, Json<TaskView>)> {
    let input = payload.validate()?;
    let task = state.services().tasks.create(&input)?;
    Ok((StatusCode::CREATED, Json(TaskView::new(&task, today()))))
}

pub async fn show_task(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Query(param): Query<TrashedParam>,
) -> AppResult<Json<TaskView>> {
    let queries = &state.services().task_queries;
    let task = if param.includes_trashed() {
        queries.get_task_with_trashed(id)?
    } else {
        queries.get_task_by_id(id)?
    };
    Ok(Json(TaskView::new(&task, today())))
}

pub async fn update_task(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> AppResult<Json<TaskView>> {
    let input = payload.validate()?;
    let task = state.services().tasks.update(id, &input)?;
    Ok(Json(TaskView::new(&task, today())))
}

pub async fn delete_task(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<Json<TaskView>> {
    state.services().tasks.delete(id)?;
    let task = state.services().task_queries.get_task_with_trashed(id)?;
    Ok(Json(TaskView::new(&task, today())))
}

pub async fn restore_task(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<Json<TaskView>> {
    let task = state.services().tasks.restore(id)?;
    Ok(Json(TaskView::new(&task, today())))
}

pub async fn force_delete_task(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services().tasks.force_delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn task_statistics(
    State(state): State<DashboardServer>,
) -> AppResult<Json<TaskStatistics>> {
    Ok(Json(state.services().task_queries.get_task_statistics()?))
}

pub async fn light_tasks(
    State(state): State<DashboardServer>,
    Query(params): Query<LightParams>,
) -> AppResult<Json<Vec<LightTask>>> {
    Ok(Json(
        state
            .services()
            .task_queries
            .list_all_light(params.search.as_deref())?,
    ))
}

// ----- categories -----

pub async fn list_categories(
    State(state): State<DashboardServer>,
    Query(params): Query<CategoryListParams>,
) -> AppResult<Json<Vec<CategoryView>>> {
    let as_tree = matches!(params.tree.as_deref(), Some("true" | "1"));
    let categories = if as_tree {
        state.services().categories.tree()?
    } else {
        state.services().categories.list()?
    };
    Ok(Json(categories.iter().map(CategoryView::from).collect()))
}

pub async fn root_categories(
    State(state): State<DashboardServer>,
) -> AppResult<Json<Vec<CategoryView>>> {
    let roots = state.services().categories.roots()?;
    Ok(Json(roots.iter().map(CategoryView::from_category).collect()))
}

pub async fn categories_with_counts(
    State(state): State<DashboardServer>,
) -> AppResult<Json<Vec<CategoryCountsView>>> {
    let rows = state.services().categories.with_counts()?;
    Ok(Json(rows.iter().map(CategoryCountsView::from).collect()))
}

pub async fn trashed_categories(
    State(state): State<DashboardServer>,
) -> AppResult<Json<Vec<CategoryView>>> {
    let rows = state.services().categories.trashed()?;
    Ok(Json(rows.iter().map(CategoryView::from_category).collect()))
}

pub async fn category_statistics(
    State(state): State<DashboardServer>,
) -> AppResult<Json<CategoryStatistics>> {
    Ok(Json(state.services().categories.statistics()?))
}

pub async fn create_category(
    State(state): State<DashboardServer>,
    Json(payload): Json<CategoryPayload>,
) -> AppResult<(StatusCode, Json<CategoryView>)> {
    let input = payload.validate()?;
    let category = state.services().categories.create(&input)?;
    Ok((StatusCode::CREATED, Json(CategoryView::from(&category))))
}

pub async fn show_category(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Query(param): Query<TrashedParam>,
) -> AppResult<Json<CategoryView>> {
    let categories = &state.services().categories;
    // A live category is returned with its relations either way
    match categories.get(id) {
        Ok(category) => Ok(Json(CategoryView::from(&category))),
        Err(e) if e.is_not_found() && param.includes_trashed() => {
            let category = categories.get_with_trashed(id)?;
            Ok(Json(CategoryView::from_category(&category)))
        }
        Err(e) => Err(e),
    }
}

pub async fn update_category(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryPayload>,
) -> AppResult<Json<CategoryView>> {
    let input = payload.validate()?;
    let category = state.services().categories.update(id, &input)?;
    Ok(Json(CategoryView::from(&category)))
}

pub async fn delete_category(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<Json<CategoryView>> {
    let category = state.services().categories.delete(id)?;
    Ok(Json(CategoryView::from_category(&category)))
}

pub async fn restore_category(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<Json<CategoryView>> {
    let category = state.services().categories.restore(id)?;
    Ok(Json(CategoryView::from(&category)))
}

pub async fn force_delete_category(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services().categories.force_delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tasks of one live category, with the usual listing query.
pub async fn category_tasks(
    State(state): State<DashboardServer>,
    Path(id): Path<i64>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<TaskPageView>> {
    state.services().categories.get(id)?;
    let query = params.parse(state.page_size())?;
    let page = state.services().task_queries.get_tasks_by_category(
        id,
        &query.filters,
        &query.sorting,
        query.page,
        query.per_page,
    )?;
    Ok(Json(TaskPageView::new(&page, today())))
}
