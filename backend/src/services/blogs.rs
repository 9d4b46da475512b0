//! Blog business rules
//!
//! Validation of create/update payloads, derivation of the index keys stored
//! with each post, and the per-post and dashboard statistics.

use crate::db::models::{
    format_timestamp, parse_timestamp, AnalyticsEvent, BlogPost, BlogStatus, DRAFT_PREFIX,
};
use crate::error::AppError;
use crate::services::analytics::classify_referrer;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Content stored for posts saved without a body
pub const EMPTY_CONTENT: &str = "<p></p>";

/// Path prefix under which blog posts are viewed on the site
pub const BLOG_PATH_PREFIX: &str = "/blog/";

/// Site path of a post, as recorded by page-view tracking
pub fn blog_page_path(id: &str) -> String {
    format!("{}{}", BLOG_PATH_PREFIX, id)
}

/// Create/update request body
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BlogRequest {
    /// Post title
    pub title: Option<String>,
    /// Post body
    pub content: Option<String>,
    /// Tags
    pub tags: Option<Vec<String>>,
    /// "draft" (default) or "published"
    pub status: Option<String>,
    /// Reading time in minutes, default 1
    pub reading_time: Option<i64>,
    /// Object keys of attached images
    pub images: Option<Vec<String>>,
}

/// A validated create/update request
#[derive(Debug, Clone, PartialEq)]
pub struct BlogFields {
    /// Trimmed, non-empty title
    pub title: String,
    /// Trimmed content, `<p></p>` when empty
    pub content: String,
    /// Tags
    pub tags: Vec<String>,
    /// Target status
    pub status: BlogStatus,
    /// Reading time in minutes (at least 1)
    pub reading_time: i64,
    /// Image object keys
    pub images: Vec<String>,
}

impl BlogRequest {
    /// Validate the request
    ///
    /// Title is always required; content only when publishing.
    pub fn validate(self) -> Result<BlogFields, AppError> {
        let title = self.title.unwrap_or_default().trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required.".to_string()));
        }

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => BlogStatus::Draft,
            Some(value) => BlogStatus::parse(value).ok_or_else(|| {
                AppError::Validation(format!(
                    "Invalid status: {}. Expected 'draft' or 'published'.",
                    value
                ))
            })?,
        };

        let content = self.content.unwrap_or_default().trim().to_string();
        if status == BlogStatus::Published && content.is_empty() {
            return Err(AppError::Validation(
                "Content is required for published posts.".to_string(),
            ));
        }

        let reading_time = self.reading_time.unwrap_or(1);
        if reading_time < 1 {
            return Err(AppError::Validation(
                "Reading time must be at least 1 minute.".to_string(),
            ));
        }

        Ok(BlogFields {
            title,
            content: if content.is_empty() {
                EMPTY_CONTENT.to_string()
            } else {
                content
            },
            tags: self.tags.unwrap_or_default(),
            status,
            reading_time,
            images: self.images.unwrap_or_default(),
        })
    }
}

/// Value of `published_at` after a write
///
/// An already-published post keeps its original publish time; a post
/// published for the first time gets `now`; drafts get `draft_{now}`.
pub fn resolve_published_at(status: BlogStatus, existing: Option<&BlogPost>, now: &str) -> String {
    match status {
        BlogStatus::Published => existing
            .filter(|post| post.is_published())
            .and_then(|post| post.published_at.clone())
            .filter(|value| !value.is_empty() && !value.starts_with(DRAFT_PREFIX))
            .unwrap_or_else(|| now.to_string()),
        BlogStatus::Draft => format!("{}{}", DRAFT_PREFIX, now),
    }
}

/// `published_at` for a row that never had one: published rows use their
/// creation time, drafts the draft marker
pub fn backfill_published_at(post: &BlogPost) -> String {
    if post.is_published() {
        post.created_at.clone()
    } else {
        format!("{}{}", DRAFT_PREFIX, post.created_at)
    }
}

/// `{author}_{published_at}`
pub fn author_index(author: &str, published_at: &str) -> String {
    format!("{}_{}", author, published_at)
}

fn apply_fields(post: &mut BlogPost, fields: BlogFields, now: &str, published_at: String) {
    post.title = fields.title;
    post.content = fields.content;
    post.tags = Json(fields.tags);
    post.status = fields.status.as_str().to_string();
    post.reading_time = fields.reading_time;
    post.images = Json(fields.images);
    post.updated_at = now.to_string();
    post.status_published_at = Some(format!("{}_{}", fields.status.as_str(), now));
    post.author_index = Some(author_index(&post.author, &published_at));
    post.published_at = Some(published_at);
}

/// Build a new post owned by `author`
pub fn new_post(author: &str, fields: BlogFields, now: DateTime<Utc>) -> BlogPost {
    let now = format_timestamp(now);
    let published_at = resolve_published_at(fields.status, None, &now);
    let mut post = BlogPost {
        id: Uuid::new_v4().to_string(),
        title: String::new(),
        content: String::new(),
        author: author.to_string(),
        tags: Json(Vec::new()),
        status: String::new(),
        created_at: now.clone(),
        updated_at: now.clone(),
        published_at: None,
        status_published_at: None,
        author_index: None,
        reading_time: 1,
        images: Json(Vec::new()),
    };
    apply_fields(&mut post, fields, &now, published_at);
    post
}

/// Apply an update to an existing post
pub fn updated_post(existing: &BlogPost, fields: BlogFields, now: DateTime<Utc>) -> BlogPost {
    let now = format_timestamp(now);
    let published_at = resolve_published_at(fields.status, Some(existing), &now);
    let mut post = existing.clone();
    apply_fields(&mut post, fields, &now, published_at);
    post
}

/// Visits from one referrer class
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReferrerVisits {
    /// Source label
    pub source: &'static str,
    /// Page views
    pub visits: usize,
}

/// Engagement numbers for one post
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMetrics {
    /// All recorded views
    pub total_views: usize,
    /// Distinct sessions
    pub unique_visitors: usize,
    /// Views in the last 7 days
    pub views_this_week: usize,
    /// Views in the last 30 days
    pub views_this_month: usize,
    /// Views by referrer class, most first
    pub top_referrers: Vec<ReferrerVisits>,
}

/// Response of `GET /api/blogs/:id/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogStats {
    /// Post id
    pub blog_id: String,
    /// Post title
    pub title: String,
    /// Post status
    pub status: String,
    /// Creation time
    pub created_at: String,
    /// Publish time (null for drafts)
    pub published_at: Option<String>,
    /// Engagement
    pub metrics: BlogMetrics,
}

/// Aggregate the page views of one post
pub fn blog_stats(post: &BlogPost, views: &[AnalyticsEvent], now: DateTime<Utc>) -> BlogStats {
    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);
    let mut views_this_week = 0;
    let mut views_this_month = 0;
    let mut sessions = HashSet::new();
    let mut referrers: HashMap<&'static str, usize> = HashMap::new();

    for view in views {
        sessions.insert(view.session_id.as_str());
        *referrers
            .entry(classify_referrer(&view.referrer).label())
            .or_default() += 1;
        if let Some(at) = parse_timestamp(&view.timestamp) {
            if at >= week_ago {
                views_this_week += 1;
            }
            if at >= month_ago {
                views_this_month += 1;
            }
        }
    }

    let mut top_referrers: Vec<ReferrerVisits> = referrers
        .into_iter()
        .map(|(source, visits)| ReferrerVisits { source, visits })
        .collect();
    top_referrers.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.source.cmp(b.source)));

    BlogStats {
        blog_id: post.id.clone(),
        title: post.title.clone(),
        status: post.status.clone(),
        created_at: post.created_at.clone(),
        published_at: post
            .published_at
            .clone()
            .filter(|value| !value.starts_with(DRAFT_PREFIX)),
        metrics: BlogMetrics {
            total_views: views.len(),
            unique_visitors: sessions.len(),
            views_this_week,
            views_this_month,
            top_referrers,
        },
    }
}

/// Dashboard overview numbers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    /// All posts
    pub total_blogs: usize,
    /// Published posts
    pub published_blogs: usize,
    /// Draft posts
    pub draft_blogs: usize,
    /// Views across all posts
    pub total_views: i64,
    /// total_views / published_blogs
    pub avg_views_per_blog: i64,
}

/// Publishing trends over the last 30 days
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTrends {
    /// Posts published in the last 30 days
    pub blogs_this_month: usize,
    /// `{n/4:.1} per week`
    pub publishing_rate: String,
    /// `+{min(n*5,50)}%`, or `0%`
    pub growth_rate: String,
}

/// A post in the top performers list
#[derive(Debug, Clone, Serialize)]
pub struct TopPerformer {
    /// Post id
    pub id: String,
    /// Post title
    pub title: String,
    /// Page views
    pub views: i64,
    /// Post status
    pub status: String,
}

/// Response of `GET /api/blogs/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Counts
    pub overview: DashboardOverview,
    /// Publishing trends
    pub trends: DashboardTrends,
    /// Five most viewed posts
    pub top_performers: Vec<TopPerformer>,
}

/// Aggregate all posts with their page-view counts
///
/// `view_counts` maps site paths (see [`blog_page_path`]) to view counts.
pub fn dashboard_stats(
    posts: &[BlogPost],
    view_counts: &HashMap<String, i64>,
    now: DateTime<Utc>,
) -> DashboardStats {
    let published_blogs = posts.iter().filter(|p| p.is_published()).count();
    let draft_blogs = posts
        .iter()
        .filter(|p| p.status_enum() == Some(BlogStatus::Draft))
        .count();

    let views_of = |post: &BlogPost| {
        view_counts
            .get(&blog_page_path(&post.id))
            .copied()
            .unwrap_or(0)
    };
    let total_views: i64 = posts.iter().map(|post| views_of(post)).sum();

    let month_ago = now - Duration::days(30);
    let blogs_this_month = posts
        .iter()
        .filter_map(BlogPost::published_datetime)
        .filter(|at| *at >= month_ago)
        .count();

    let mut ranked: Vec<&BlogPost> = posts.iter().collect();
    ranked.sort_by_key(|post| std::cmp::Reverse(views_of(*post)));
    let top_performers = ranked
        .into_iter()
        .take(5)
        .map(|post| TopPerformer {
            id: post.id.clone(),
            title: if post.title.is_empty() {
                "Untitled".to_string()
            } else {
                post.title.clone()
            },
            views: views_of(post),
            status: post.status.clone(),
        })
        .collect();

    DashboardStats {
        overview: DashboardOverview {
            total_blogs: posts.len(),
            published_blogs,
            draft_blogs,
            total_views,
            avg_views_per_blog: total_views / published_blogs.max(1) as i64,
        },
        trends: DashboardTrends {
            blogs_this_month,
            publishing_rate: format!("{:.1} per week", blogs_this_month as f64 / 4.0),
            growth_rate: if blogs_this_month > 0 {
                format!("+{}%", (blogs_this_month * 5).min(50))
            } else {
                "0%".to_string()
            },
        },
        top_performers,
    }
}
