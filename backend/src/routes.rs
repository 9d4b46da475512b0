//! HTTP routing
//!
//! Builds the axum router with every API route and the shared middleware.

use crate::api;
use crate::config::MediaBackend;
use crate::state::AppState;
use axum::{
    extract::Request,
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::time::Instant;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Portfolio backend is healthy".to_string(),
    })
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Build the application router
///
/// With the local media backend, stored objects are also served under
/// `/media` so public URLs resolve against this server.
pub fn router(state: AppState) -> Router {
    let media_dir = match (&state.config.media.backend, &state.config.media.bucket) {
        (MediaBackend::Local, Some(_)) => Some(state.config.media.media_dir.clone()),
        _ => None,
    };

    let app = Router::new()
        .route("/api/health", get(health_check))
        // Blogs
        .route(
            "/api/blogs",
            get(api::blogs::list_published_blogs).post(api::blogs::create_blog),
        )
        .route("/api/blogs/summary", get(api::blogs::list_blog_summaries))
        .route("/api/blogs/stats", get(api::blogs::dashboard_stats))
        .route(
            "/api/blogs/:id",
            get(api::blogs::get_blog)
                .put(api::blogs::update_blog)
                .delete(api::blogs::delete_blog),
        )
        .route("/api/blogs/:id/stats", get(api::blogs::blog_stats))
        // Analytics
        .route("/api/analytics", get(api::analytics::web_analytics))
        .route("/api/analytics/events", post(api::analytics::track_event))
        // Media
        .route("/api/media", get(api::media::get_media))
        .route(
            "/api/media/profile",
            get(api::media::get_profile_image).post(api::media::upload_profile_image),
        )
        .route(
            "/api/media/resume",
            get(api::media::download_resume).post(api::media::upload_resume),
        )
        .route("/api/media/upload", post(api::media::upload_file))
        .route(
            "/api/media/presigned-url",
            get(api::media::presigned_upload_url),
        )
        // Users
        .route("/api/users/confirm", post(api::users::confirm_user))
        .route("/api/users/logout", post(api::users::logout))
        .with_state(state);

    let app = match media_dir {
        Some(dir) => app.nest_service("/media", ServeDir::new(dir)),
        None => app,
    };

    app
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}
