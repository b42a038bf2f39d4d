//! HTTP-level tests driving the router directly.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use taskdeck::cache::CategoryStatsCache;
use taskdeck::dashboard::{DashboardServer, build_router, start_server};
use taskdeck::db::Database;
use taskdeck::services::Services;
use tower::ServiceExt;

fn app() -> Router {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
    let services = Services::new(db, Arc::new(CategoryStatsCache::in_memory()));
    build_router(DashboardServer::new(services, 10))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec(), location)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_form(app: &Router, uri: &str, body: &str) -> (StatusCode, String, Option<String>) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body, location) = send(app, request).await;
    (status, String::from_utf8_lossy(&body).into_owned(), location)
}

async fn get_html(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(app, request).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn health_reports_version() {
    let app = app();
    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn api_task_lifecycle() {
    let app = app();

    let (status, created) = send_json(
        &app,
        "POST",
        "/api/tasks",
        json!({"title": "Write report", "status": "pending", "priority": "high", "due_date": "2024-01-15"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Write report");
    assert_eq!(created["priority"], "high");
    assert_eq!(created["due_date"], "2024-01-15");
    let id = created["id"].as_i64().unwrap();

    let (status, list) = get_json(&app, "/api/tasks?priority=high").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["id"], id);

    let (status, deleted) = send_json(&app, "DELETE", &format!("/api/tasks/{id}"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(deleted["deleted_at"].is_string());

    let (status, _) = get_json(&app, &format!("/api/tasks/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&app, &format!("/api/tasks/{id}?with=with_trashed")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, restored) =
        send_json(&app, "POST", &format!("/api/tasks/{id}/restore"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(restored["deleted_at"].is_null());

    let request = Request::delete(format!("/api/tasks/{id}/force"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn api_validation_errors_are_structured() {
    let app = app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/tasks",
        json!({"title": "  ", "status": "pending", "priority": "low"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");
    assert_eq!(body["field"], "title");
    assert_eq!(body["message"], "Title is required.");

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/tasks",
        json!({"title": "x", "status": "archived", "priority": "low"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_FIELD_VALUE");
    assert_eq!(body["field"], "status");

    let (status, body) = get_json(&app, "/api/tasks/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");

    let (status, _) = get_json(&app, "/api/tasks?due_from=yesterday").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn api_category_hierarchy() {
    let app = app();

    let (status, root) = send_json(&app, "POST", "/api/categories", json!({"name": "Work"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let root_id = root["id"].as_i64().unwrap();

    let (status, child) = send_json(
        &app,
        "POST",
        "/api/categories",
        json!({"name": "Email", "parent_id": root_id}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(child["parent_name"], "Work");
    let child_id = child["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/categories",
        json!({"name": "Inbox", "parent_id": child_id}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "HIERARCHY_TOO_DEEP");
    assert_eq!(body["field"], "parent_id");

    let (status, roots) = get_json(&app, "/api/categories/roots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roots.as_array().unwrap().len(), 1);

    let (status, tree) = get_json(&app, "/api/categories?tree=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree[0]["children"][0]["name"], "Email");
}

#[tokio::test]
async fn api_category_statistics_follow_writes() {
    let app = app();
    let (_, work) = send_json(&app, "POST", "/api/categories", json!({"name": "Work"})).await;
    let work_id = work["id"].as_i64().unwrap();

    let (status, stats) = get_json(&app, "/api/categories/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"][0]["tasks_total_count"], 0);

    send_json(
        &app,
        "POST",
        "/api/tasks",
        json!({"title": "t", "status": "completed", "priority": "low", "category_id": work_id}),
    )
    .await;

    let (_, stats) = get_json(&app, "/api/categories/statistics").await;
    assert_eq!(stats["stats"][0]["tasks_total_count"], 1);
    assert_eq!(stats["stats"][0]["tasks_completed_count"], 1);
    assert_eq!(stats["totals"]["completed"], 1);

    let (status, tasks) = get_json(&app, &format!("/api/categories/{work_id}/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks["total"], 1);

    let (status, _) = get_json(&app, "/api/categories/404/tasks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_redirects_to_tasks() {
    let app = app();
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, _, location) = send(&app, request).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/tasks"));
}

#[tokio::test]
async fn task_form_submit_redirects_with_flash() {
    let app = app();
    let (status, _, location) = post_form(
        &app,
        "/tasks",
        "title=Pay+rent&description=&status=pending&priority=high&due_date=2024-02-01&category_id=",
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = location.unwrap();
    assert!(location.starts_with("/tasks?msg="));

    let (status, html) = get_html(&app, &location).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Pay rent"));
    assert!(html.contains("created"));
}

#[tokio::test]
async fn invalid_task_form_is_redisplayed() {
    let app = app();
    let (status, html, location) = post_form(
        &app,
        "/tasks",
        "title=&status=pending&priority=high&due_date=not-a-date",
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(location.is_none());
    assert!(html.contains("Title is required."));
}

#[tokio::test]
async fn category_pages_render() {
    let app = app();
    let (status, _, location) = post_form(&app, "/categories", "name=Home&parent_id=").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(location.unwrap().starts_with("/categories?msg="));

    let (status, html) = get_html(&app, "/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Home"));

    let (status, html) = get_html(&app, "/categories/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Home"));

    let (status, _) = get_html(&app, "/categories/77").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn html_escapes_user_content() {
    let app = app();
    post_form(
        &app,
        "/tasks",
        "title=%3Cscript%3Ealert(1)%3C%2Fscript%3E&status=pending&priority=low",
    )
    .await;

    let (_, html) = get_html(&app, "/tasks").await;
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn server_binds_and_shuts_down() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let services = Services::new(db, Arc::new(CategoryStatsCache::in_memory()));
    let (shutdown, addr, handle) = start_server(DashboardServer::new(services, 10), "127.0.0.1:0")
        .await
        .unwrap();
    assert_ne!(addr.port(), 0);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn huge_page_number_is_served() {
    let app = app();
    send_json(
        &app,
        "POST",
        "/api/tasks",
        json!({"title": "t", "status": "pending", "priority": "low"}),
    )
    .await;

    let (status, body) = get_json(&app, "/api/tasks?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = get_html(&app, "/tasks?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(&app, "/api/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "t");
}
