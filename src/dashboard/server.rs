//! HTTP server implementation.
//!
//! This module provides the axum-based HTTP server that serves the HTML
//! pages and exposes the JSON API.

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{api, pages};
use crate::services::Services;

/// Server state shared across handlers.
#[derive(Clone)]
pub struct DashboardServer {
    services: Services,
    /// Tasks per page when the request does not specify one.
    page_size: i64,
}

impl DashboardServer {
    pub fn new(services: Services, page_size: i64) -> Self {
        Self {
            services,
            page_size: page_size.max(1),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Task pages
        .route("/", get(pages::root))
        .route("/tasks", get(pages::tasks_index).post(pages::tasks_store))
        .route("/tasks/new", get(pages::tasks_create))
        .route(
            "/tasks/{id}",
            get(pages::tasks_show).post(pages::tasks_update),
        )
        .route("/tasks/{id}/edit", get(pages::tasks_edit))
        .route("/tasks/{id}/delete", post(pages::tasks_delete))
        .route("/tasks/{id}/restore", post(pages::tasks_restore))
        .route("/tasks/{id}/force-delete", post(pages::tasks_force_delete))
        // Category pages
        .route(
            "/categories",
            get(pages::categories_index).post(pages::categories_store),
        )
        .route("/categories/new", get(pages::categories_create))
        .route("/categories/statistics", get(pages::categories_statistics))
        .route(
            "/categories/{id}",
            get(pages::categories_show).post(pages::categories_update),
        )
        .route("/categories/{id}/edit", get(pages::categories_edit))
        .route("/categories/{id}/delete", post(pages::categories_delete))
        .route("/categories/{id}/restore", post(pages::categories_restore))
        .route(
            "/categories/{id}/force-delete",
            post(pages::categories_force_delete),
        )
        // JSON API
        .route("/api/health", get(api::health))
        .route("/api/tasks", get(api::list_tasks).post(api::create_task))
        .route("/api/tasks/stats", get(api::task_statistics))
        .route("/api/tasks/light", get(api::light_tasks))
        .route(
            "/api/tasks/{id}",
            get(api::show_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/api/tasks/{id}/restore", post(api::restore_task))
        .route(
            "/api/tasks/{id}/force",
            axum::routing::delete(api::force_delete_task),
        )
        .route(
            "/api/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route("/api/categories/roots", get(api::root_categories))
        .route("/api/categories/counts", get(api::categories_with_counts))
        .route("/api/categories/trashed", get(api::trashed_categories))
        .route("/api/categories/statistics", get(api::category_statistics))
        .route(
            "/api/categories/{id}",
            get(api::show_category)
                .put(api::update_category)
                .delete(api::delete_category),
        )
        .route("/api/categories/{id}/tasks", get(api::category_tasks))
        .route("/api/categories/{id}/restore", post(api::restore_category))
        .route(
            "/api/categories/{id}/force",
            axum::routing::delete(api::force_delete_category),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve in a background task.
///
/// Returns a oneshot sender that triggers graceful shutdown, the bound
/// address, and the handle of the serving task.
pub async fn start_server(
    state: DashboardServer,
    addr: &str,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr, JoinHandle<()>)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Server shutting down");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr, handle))
}
