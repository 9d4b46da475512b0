//! Table data models
//!
//! Defines the records stored in the blog, analytics and user tables,
//! plus the timestamp and sort-key formatting they share.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Prefix stored in `published_at` for drafts
pub const DRAFT_PREFIX: &str = "draft_";

/// Format a timestamp the way every table stores it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
///
/// Accepts RFC 3339 as well as naive ISO-8601 (treated as UTC), which is what
/// older rows carry.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.strip_prefix(DRAFT_PREFIX).unwrap_or(value);
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Publication status of a blog post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    /// Not publicly visible
    Draft,
    /// Publicly visible
    Published,
}

impl BlogStatus {
    /// Convert the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
        }
    }

    /// Parse a status string, returning `None` for unknown values
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(BlogStatus::Draft),
            "published" => Some(BlogStatus::Published),
            _ => None,
        }
    }
}

/// A blog post record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogPost {
    /// Unique identifier
    pub id: String,
    /// Post title
    pub title: String,
    /// Post body (HTML)
    pub content: String,
    /// User id of the author
    pub author: String,
    /// Free-form tags
    pub tags: Json<Vec<String>>,
    /// Stored as "draft" or "published"
    pub status: String,
    /// When the post was created
    pub created_at: String,
    /// When the post was last written
    pub updated_at: String,
    /// First publish time, or `draft_{time}` for drafts
    pub published_at: Option<String>,
    /// `{status}_{time}` sort key
    pub status_published_at: Option<String>,
    /// `{author}_{published_at}` sort key
    pub author_index: Option<String>,
    /// Estimated reading time in minutes
    pub reading_time: i64,
    /// Object keys of attached images
    pub images: Json<Vec<String>>,
}

impl BlogPost {
    /// Get the status as enum
    pub fn status_enum(&self) -> Option<BlogStatus> {
        BlogStatus::parse(&self.status)
    }

    /// Whether the post is publicly visible
    pub fn is_published(&self) -> bool {
        self.status_enum() == Some(BlogStatus::Published)
    }

    /// Publish time for published posts; `None` for drafts or unset values
    pub fn published_datetime(&self) -> Option<DateTime<Utc>> {
        match self.published_at.as_deref() {
            Some(value) if !value.starts_with(DRAFT_PREFIX) => parse_timestamp(value),
            _ => None,
        }
    }

    /// Pagination key pointing at this post
    pub fn key(&self) -> BlogKey {
        BlogKey {
            id: self.id.clone(),
            status: self.status.clone(),
            published_at: self.published_at.clone().unwrap_or_default(),
        }
    }
}

/// Lightweight projection used by the summary listing
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogSummary {
    /// Unique identifier
    pub id: String,
    /// Post title
    pub title: String,
    /// Stored status
    pub status: String,
    /// When the post was created
    pub created_at: String,
    /// Publish time or draft marker
    pub published_at: Option<String>,
    /// User id of the author
    pub author: String,
    /// Ordering key (publish or draft time, falling back to creation)
    #[serde(skip)]
    pub sort_at: String,
}

/// Exclusive start key for published listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogKey {
    /// Post id (tie breaker)
    pub id: String,
    /// Index partition
    pub status: String,
    /// Index sort key
    pub published_at: String,
}

/// Exclusive start key for summary listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryKey {
    /// Post id (tie breaker)
    pub id: String,
    /// Ordering key of the last returned row
    pub sort_at: String,
}

/// A stored analytics event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsEvent {
    /// Unique identifier
    pub id: String,
    /// When the event was recorded
    pub timestamp: String,
    /// `YYYY-MM-DD` bucket
    pub date: String,
    /// `YYYY-MM-DD-HH` bucket
    pub hour: String,
    /// Event type, e.g. "page_view"
    pub event_type: String,
    /// Path of the viewed page
    pub page_path: String,
    /// Title of the viewed page
    pub page_title: String,
    /// Client user agent
    pub user_agent: String,
    /// Client IP address
    pub ip_address: String,
    /// Referrer URL
    pub referrer: String,
    /// Client session identifier
    pub session_id: String,
    /// Authenticated user, if any
    pub user_id: Option<String>,
    /// Expiry (unix seconds)
    pub ttl: i64,
}

/// A user in the identity directory
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Login name
    pub username: String,
    /// Stable subject identifier
    pub user_id: String,
    /// Whether sign-up has been confirmed
    pub confirmed: bool,
    /// When the user was created
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_sortable() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(earlier), "2024-01-02T03:04:05.000000Z");
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp("2024-05-06T07:08:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T07:08:09.000000"), Some(expected));
        assert_eq!(parse_timestamp("draft_2024-05-06T07:08:09Z"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_blog_status_parse() {
        assert_eq!(BlogStatus::parse("draft"), Some(BlogStatus::Draft));
        assert_eq!(BlogStatus::parse("published"), Some(BlogStatus::Published));
        assert_eq!(BlogStatus::parse("archived"), None);
        assert_eq!(BlogStatus::Published.as_str(), "published");
    }
}
