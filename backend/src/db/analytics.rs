//! Analytics table operations

use super::models::AnalyticsEvent;
use super::Database;
use crate::error::AppError;
use tracing::debug;

const EVENT_COLUMNS: &str = "id, timestamp, date, hour, event_type, page_path, page_title, \
     user_agent, ip_address, referrer, session_id, user_id, ttl";

impl Database {
    /// Store an analytics event
    pub async fn insert_event(&self, event: &AnalyticsEvent) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO analytics_events (id, timestamp, date, hour, event_type, page_path, \
             page_title, user_agent, ip_address, referrer, session_id, user_id, ttl) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.timestamp)
        .bind(&event.date)
        .bind(&event.hour)
        .bind(&event.event_type)
        .bind(&event.page_path)
        .bind(&event.page_title)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .bind(&event.referrer)
        .bind(&event.session_id)
        .bind(&event.user_id)
        .bind(event.ttl)
        .execute(self.pool())
        .await?;

        debug!(event_id = %event.id, event_type = %event.event_type, "Stored analytics event");
        Ok(())
    }

    /// Unexpired events of one type recorded in `[from, to)`
    ///
    /// `from` and `to` are stored-format timestamps; `now` is unix seconds.
    pub async fn events_between(
        &self,
        event_type: &str,
        from: &str,
        to: &str,
        now: i64,
    ) -> Result<Vec<AnalyticsEvent>, AppError> {
        let events = sqlx::query_as::<_, AnalyticsEvent>(&format!(
            "SELECT {} FROM analytics_events \
             WHERE event_type = ? AND timestamp >= ? AND timestamp < ? AND ttl > ? \
             ORDER BY timestamp ASC",
            EVENT_COLUMNS
        ))
        .bind(event_type)
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Unexpired events of one type for a single page path
    pub async fn events_for_path(
        &self,
        event_type: &str,
        page_path: &str,
        now: i64,
    ) -> Result<Vec<AnalyticsEvent>, AppError> {
        let events = sqlx::query_as::<_, AnalyticsEvent>(&format!(
            "SELECT {} FROM analytics_events \
             WHERE event_type = ? AND page_path = ? AND ttl > ? \
             ORDER BY timestamp ASC",
            EVENT_COLUMNS
        ))
        .bind(event_type)
        .bind(page_path)
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// View counts per page path for paths starting with `prefix`
    pub async fn view_counts_by_path(
        &self,
        event_type: &str,
        prefix: &str,
        now: i64,
    ) -> Result<Vec<(String, i64)>, AppError> {
        let counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT page_path, COUNT(*) FROM analytics_events \
             WHERE event_type = ? AND substr(page_path, 1, ?) = ? AND ttl > ? \
             GROUP BY page_path",
        )
        .bind(event_type)
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(counts)
    }

    /// Delete events whose expiry has passed, returning how many were removed
    pub async fn purge_expired_events(&self, now: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM analytics_events WHERE ttl <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
