//! Blog API handlers
//!
//! Contains HTTP request handlers for blog CRUD, listing and statistics.

use crate::api::auth::AuthUser;
use crate::api::utils::clamp_page_size;
use crate::db::{BlogKey, BlogPost, BlogStatus, BlogSummary, SummaryKey};
use crate::error::AppError;
use crate::services::analytics::PAGE_VIEW;
use crate::services::blogs::{
    blog_page_path, blog_stats as build_blog_stats, dashboard_stats as build_dashboard_stats,
    new_post, updated_post, BlogRequest, BlogStats, DashboardStats, BLOG_PATH_PREFIX,
};
use crate::services::media::IMAGE_URL_EXPIRY_SECS;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{Method, StatusCode},
    response::Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Response for create and update
#[derive(Debug, Serialize)]
pub struct BlogWriteResponse {
    /// Human-readable message
    pub message: String,
    /// Post id
    pub id: String,
}

/// Response for the published listing
#[derive(Debug, Serialize)]
pub struct PublishedBlogsResponse {
    /// Page of published posts
    pub blogs: Vec<BlogPost>,
    /// JSON-encoded key to pass back as `lastKey`, null on the last page
    #[serde(rename = "lastKey")]
    pub last_key: Option<String>,
}

/// Response for the summary listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummariesResponse {
    /// Page of summaries
    pub blogs: Vec<BlogSummary>,
    /// Number of summaries in this page
    pub count: usize,
    /// Whether another page exists
    pub has_more: bool,
    /// Opaque token for the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Response for delete
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBlogResponse {
    /// Human-readable message
    pub message: String,
    /// Id of the removed post
    pub deleted_id: String,
}

/// POST /api/blogs - Create a blog post owned by the caller
pub async fn create_blog(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BlogWriteResponse>), AppError> {
    let Json(request) = payload?;
    let fields = request.validate()?;

    let post = new_post(&auth.user_id, fields, Utc::now());
    state.db.insert_blog(&post).await?;

    info!(blog_id = %post.id, author = %post.author, status = %post.status, "Blog created");
    Ok((
        StatusCode::CREATED,
        Json(BlogWriteResponse {
            message: "Blog created successfully".to_string(),
            id: post.id,
        }),
    ))
}

/// GET /api/blogs - Published posts, newest first
pub async fn list_published_blogs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PublishedBlogsResponse>, AppError> {
    let limit = clamp_page_size(params.get("limit").map(String::as_str));

    let start = match params.get("lastKey").filter(|k| !k.is_empty()) {
        Some(raw) => Some(
            serde_json::from_str::<BlogKey>(raw)
                .map_err(|_| AppError::Validation("Invalid lastKey parameter".to_string()))?,
        ),
        None => None,
    };

    let (blogs, next) = state.db.list_published_blogs(limit, start.as_ref()).await?;
    let last_key = next
        .map(|key| serde_json::to_string(&key))
        .transpose()
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(PublishedBlogsResponse { blogs, last_key }))
}

fn decode_page_token(token: &str) -> Option<SummaryKey> {
    let bytes = STANDARD.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn encode_page_token(key: &SummaryKey) -> Result<String, AppError> {
    let json = serde_json::to_vec(key).map_err(|e| AppError::Internal(e.into()))?;
    Ok(STANDARD.encode(json))
}

/// GET /api/blogs/summary - Lightweight listing of all posts, drafts included
pub async fn list_blog_summaries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<BlogSummariesResponse>, AppError> {
    let page_size = clamp_page_size(params.get("pageSize").map(String::as_str));

    let status = match params.get("status").map(String::as_str) {
        None | Some("") | Some("all") => None,
        Some(value) => Some(BlogStatus::parse(value).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid status filter: {}. Expected 'all', 'draft' or 'published'.",
                value
            ))
        })?),
    };

    let start = params.get("lastKey").and_then(|token| {
        let key = decode_page_token(token);
        if key.is_none() {
            warn!(token = %token, "Invalid lastKey provided, starting from the first page");
        }
        key
    });

    info!(page_size, status = ?status, user_id = %auth.user_id, "Fetching blog summaries");
    let (blogs, next) = state
        .db
        .list_blog_summaries(status, page_size, start.as_ref())
        .await?;

    let next_page_token = next.as_ref().map(encode_page_token).transpose()?;
    Ok(Json(BlogSummariesResponse {
        count: blogs.len(),
        has_more: next_page_token.is_some(),
        blogs,
        next_page_token,
    }))
}

/// GET /api/blogs/:id - A published post with signed image URLs
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    let mut post = state
        .db
        .get_published_blog(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    if !post.images.0.is_empty() {
        let media = state.media()?;
        let expires_in = Duration::from_secs(IMAGE_URL_EXPIRY_SECS);
        let urls = try_join_all(
            post.images
                .0
                .iter()
                .map(|key| media.signed_url(Method::GET, key, expires_in)),
        )
        .await?;
        post.images.0 = urls;
    }

    Ok(Json(post))
}

/// PUT /api/blogs/:id - Update a post owned by the caller
pub async fn update_blog(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> Result<Json<BlogWriteResponse>, AppError> {
    let Json(request) = payload?;
    let fields = request.validate()?;

    let existing = state
        .db
        .get_blog(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found.".to_string()))?;

    if existing.author != auth.user_id {
        return Err(AppError::Forbidden(
            "You can only update your own blogs.".to_string(),
        ));
    }

    let post = updated_post(&existing, fields, Utc::now());
    if !state.db.update_blog(&post).await? {
        return Err(AppError::NotFound("Blog not found.".to_string()));
    }

    info!(blog_id = %id, user_id = %auth.user_id, status = %post.status, "Blog updated");
    Ok(Json(BlogWriteResponse {
        message: format!("Blog {} updated successfully.", post.status),
        id,
    }))
}

/// DELETE /api/blogs/:id - Delete a post owned by the caller
pub async fn delete_blog(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteBlogResponse>, AppError> {
    let existing = state
        .db
        .get_blog(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found".to_string()))?;

    if existing.author != auth.user_id {
        return Err(AppError::Forbidden(
            "You can only delete your own blogs.".to_string(),
        ));
    }

    info!(blog_id = %id, title = %existing.title, "Deleting blog");
    if !state.db.delete_blog(&id).await? {
        return Err(AppError::NotFound("Blog post not found".to_string()));
    }

    Ok(Json(DeleteBlogResponse {
        message: "Blog post deleted successfully".to_string(),
        deleted_id: id,
    }))
}

/// GET /api/blogs/:id/stats - View statistics for one post
pub async fn blog_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BlogStats>, AppError> {
    let post = state
        .db
        .get_blog(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    debug!(blog_id = %id, user_id = %auth.user_id, "Fetching blog stats");
    let now = Utc::now();
    let views = state
        .db
        .events_for_path(PAGE_VIEW, &blog_page_path(&id), now.timestamp())
        .await?;

    Ok(Json(build_blog_stats(&post, &views, now)))
}

/// GET /api/blogs/stats - Dashboard statistics across all posts
pub async fn dashboard_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    debug!(user_id = %auth.user_id, "Fetching dashboard stats");
    let now = Utc::now();
    let (posts, counts) = tokio::try_join!(
        state.db.all_blogs(),
        state
            .db
            .view_counts_by_path(PAGE_VIEW, BLOG_PATH_PREFIX, now.timestamp()),
    )?;

    let counts: HashMap<String, i64> = counts.into_iter().collect();
    Ok(Json(build_dashboard_stats(&posts, &counts, now)))
}
