//! Blog table operations

use super::models::{BlogKey, BlogPost, BlogStatus, BlogSummary, SummaryKey};
use super::Database;
use crate::error::AppError;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

const BLOG_COLUMNS: &str = "id, title, content, author, tags, status, created_at, updated_at, \
     published_at, status_published_at, author_index, reading_time, images";

/// Ordering key for the summary listing: the draft marker is stripped so
/// drafts and published posts interleave by time.
const SUMMARY_SORT_EXPR: &str = "CASE \
     WHEN substr(published_at, 1, 6) = 'draft_' THEN substr(published_at, 7) \
     ELSE COALESCE(NULLIF(published_at, ''), created_at) END";

impl Database {
    /// Insert a new blog post
    pub async fn insert_blog(&self, post: &BlogPost) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO blogs (id, title, content, author, tags, status, created_at, updated_at, \
             published_at, status_published_at, author_index, reading_time, images) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.author)
        .bind(Json(&post.tags.0))
        .bind(&post.status)
        .bind(&post.created_at)
        .bind(&post.updated_at)
        .bind(&post.published_at)
        .bind(&post.status_published_at)
        .bind(&post.author_index)
        .bind(post.reading_time)
        .bind(Json(&post.images.0))
        .execute(self.pool())
        .await?;

        debug!(blog_id = %post.id, "Inserted blog");
        Ok(())
    }

    /// Get a blog post by id regardless of status
    pub async fn get_blog(&self, id: &str) -> Result<Option<BlogPost>, AppError> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blogs WHERE id = ?",
            BLOG_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(post)
    }

    /// Get a blog post by id only if it is published
    pub async fn get_published_blog(&self, id: &str) -> Result<Option<BlogPost>, AppError> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blogs WHERE id = ? AND status = ?",
            BLOG_COLUMNS
        ))
        .bind(id)
        .bind(BlogStatus::Published.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(post)
    }

    /// Rewrite every mutable field of an existing post
    ///
    /// Returns false when no row with the post's id exists.
    pub async fn update_blog(&self, post: &BlogPost) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE blogs SET title = ?, content = ?, tags = ?, status = ?, updated_at = ?, \
             published_at = ?, status_published_at = ?, author_index = ?, reading_time = ?, \
             images = ? WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(Json(&post.tags.0))
        .bind(&post.status)
        .bind(&post.updated_at)
        .bind(&post.published_at)
        .bind(&post.status_published_at)
        .bind(&post.author_index)
        .bind(post.reading_time)
        .bind(Json(&post.images.0))
        .bind(&post.id)
        .execute(self.pool())
        .await?;

        debug!(blog_id = %post.id, "Updated blog");
        Ok(result.rows_affected() > 0)
    }

    /// Delete a blog post, returning whether a row was removed
    pub async fn delete_blog(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        debug!(blog_id = %id, "Deleted blog");
        Ok(result.rows_affected() > 0)
    }

    /// Page through published posts, newest first
    ///
    /// Walks the (status, published_at) index. Returns the page and the key to
    /// resume from, which is `None` on the last page.
    pub async fn list_published_blogs(
        &self,
        limit: usize,
        start: Option<&BlogKey>,
    ) -> Result<(Vec<BlogPost>, Option<BlogKey>), AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM blogs WHERE status = ",
            BLOG_COLUMNS
        ));
        query.push_bind(BlogStatus::Published.as_str());

        if let Some(key) = start {
            query
                .push(" AND (published_at < ")
                .push_bind(key.published_at.clone())
                .push(" OR (published_at = ")
                .push_bind(key.published_at.clone())
                .push(" AND id < ")
                .push_bind(key.id.clone())
                .push("))");
        }

        query
            .push(" ORDER BY published_at DESC, id DESC LIMIT ")
            .push_bind(limit as i64 + 1);

        let mut posts = query
            .build_query_as::<BlogPost>()
            .fetch_all(self.pool())
            .await?;

        let next = if posts.len() > limit {
            posts.truncate(limit);
            posts.last().map(BlogPost::key)
        } else {
            None
        };

        Ok((posts, next))
    }

    /// Page through lightweight post summaries, newest first
    ///
    /// `status` of `None` lists every post.
    pub async fn list_blog_summaries(
        &self,
        status: Option<BlogStatus>,
        page_size: usize,
        start: Option<&SummaryKey>,
    ) -> Result<(Vec<BlogSummary>, Option<SummaryKey>), AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT id, title, status, created_at, published_at, author, sort_at FROM \
             (SELECT id, title, status, created_at, published_at, author, {} AS sort_at \
             FROM blogs) WHERE 1 = 1",
            SUMMARY_SORT_EXPR
        ));

        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        if let Some(key) = start {
            query
                .push(" AND (sort_at < ")
                .push_bind(key.sort_at.clone())
                .push(" OR (sort_at = ")
                .push_bind(key.sort_at.clone())
                .push(" AND id < ")
                .push_bind(key.id.clone())
                .push("))");
        }

        query
            .push(" ORDER BY sort_at DESC, id DESC LIMIT ")
            .push_bind(page_size as i64 + 1);

        let mut summaries = query
            .build_query_as::<BlogSummary>()
            .fetch_all(self.pool())
            .await?;

        let next = if summaries.len() > page_size {
            summaries.truncate(page_size);
            summaries.last().map(|s| SummaryKey {
                id: s.id.clone(),
                sort_at: s.sort_at.clone(),
            })
        } else {
            None
        };

        Ok((summaries, next))
    }

    /// Every blog post, for dashboard aggregation
    pub async fn all_blogs(&self) -> Result<Vec<BlogPost>, AppError> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blogs ORDER BY created_at DESC",
            BLOG_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(posts)
    }

    /// Posts whose published_at was never set
    pub async fn blogs_missing_published_at(&self) -> Result<Vec<BlogPost>, AppError> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blogs WHERE published_at IS NULL OR published_at = ''",
            BLOG_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(posts)
    }

    /// Set the publish key and the author index derived from it
    pub async fn set_published_at(
        &self,
        id: &str,
        published_at: &str,
        author_index: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE blogs SET published_at = ?, author_index = ? WHERE id = ?")
            .bind(published_at)
            .bind(author_index)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
