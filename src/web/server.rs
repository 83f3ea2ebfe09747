use axum::{routing::get, routing::post, Json, Router};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::api::robot as robot_handlers;
use super::api::status as status_handlers;
use super::api_doc::ApiDoc;
use super::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Robot commands
        .route("/api/scan", post(robot_handlers::scan))
        .route("/api/capture", post(robot_handlers::capture))
        .route("/api/photo", post(robot_handlers::photo))
        .route("/api/heading", post(robot_handlers::heading))
        .route("/api/antenna/{position}", post(robot_handlers::antenna))
        .route("/api/stop", post(robot_handlers::stop))
        // Status
        .route("/api/status", get(status_handlers::controller))
        .route("/api/connectivity", get(status_handlers::connectivity))
        // OpenAPI
        .route(
            "/api-doc/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server<F>(bind_addr: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
