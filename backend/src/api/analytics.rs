//! Analytics API handlers

use crate::api::utils::{client_ip, header_str, MessageResponse};
use crate::error::AppError;
use crate::services::analytics::{
    build_event, build_report, ClientInfo, DateRange, TrackEventRequest, WebAnalyticsReport,
    PAGE_VIEW,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap},
    response::Json,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

/// POST /api/analytics/events - Record a page view or custom event
pub async fn track_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TrackEventRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(request) = payload?;

    let client = ClientInfo {
        user_agent: header_str(&headers, header::USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string(),
        ip_address: client_ip(&headers),
    };
    let event = build_event(request, client, Utc::now());
    state.db.insert_event(&event).await?;

    debug!(
        event_type = %event.event_type,
        page_path = %event.page_path,
        session_id = %event.session_id,
        "Tracked analytics event"
    );
    Ok(Json(MessageResponse::new(
        "Analytics event tracked successfully",
    )))
}

/// GET /api/analytics - Web analytics report for a date range
pub async fn web_analytics(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<WebAnalyticsReport>, AppError> {
    let range = DateRange::parse(params.get("range").map(String::as_str));
    let now = Utc::now();
    let ((from, to), (prev_from, prev_to)) = range.windows(now);

    let (current, previous) = tokio::try_join!(
        state
            .db
            .events_between(PAGE_VIEW, &from, &to, now.timestamp()),
        state
            .db
            .events_between(PAGE_VIEW, &prev_from, &prev_to, now.timestamp()),
    )?;

    info!(
        range = ?range,
        current = current.len(),
        previous = previous.len(),
        "Building analytics report"
    );
    Ok(Json(build_report(&current, &previous, range, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use axum::http::HeaderValue;

    async fn create_test_state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        AppState::new(db, None, Config::default())
    }

    fn page_view(path: &str, session: &str, referrer: &str) -> TrackEventRequest {
        TrackEventRequest {
            event_type: Some(PAGE_VIEW.to_string()),
            page_path: Some(path.to_string()),
            page_title: Some(format!("Page {}", path)),
            referrer: Some(referrer.to_string()),
            session_id: Some(session.to_string()),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_track_event_records_client_info() {
        let state = create_test_state().await;
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));

        let Json(response) = track_event(
            State(state.clone()),
            headers,
            Ok(Json(page_view("/blog/abc", "s1", ""))),
        )
        .await
        .unwrap();
        assert_eq!(response.message, "Analytics event tracked successfully");

        let now = Utc::now().timestamp();
        let events = state
            .db
            .events_for_path(PAGE_VIEW, "/blog/abc", now)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_agent, "Mozilla/5.0");
        assert_eq!(events[0].ip_address, "198.51.100.4");
        assert_eq!(events[0].session_id, "s1");
    }

    #[tokio::test]
    async fn test_web_analytics_counts_tracked_views() {
        let state = create_test_state().await;
        for (path, session, referrer) in [
            ("/", "s1", "https://www.google.com/"),
            ("/blog/abc", "s1", ""),
            ("/", "s2", "https://twitter.com/x"),
        ] {
            track_event(
                State(state.clone()),
                HeaderMap::new(),
                Ok(Json(page_view(path, session, referrer))),
            )
            .await
            .unwrap();
        }

        let mut params = HashMap::new();
        params.insert("range".to_string(), "1d".to_string());
        let Json(report) = web_analytics(State(state), Query(params)).await.unwrap();

        assert_eq!(report.total_page_views, 3);
        assert_eq!(report.unique_visitors, 2);
        assert_eq!(report.top_pages[0].path, "/");
        assert_eq!(report.top_pages[0].views, 2);
        assert_eq!(report.daily_stats.len(), 1);
        assert_eq!(report.trends.page_views.trend, "up");
    }

    #[tokio::test]
    async fn test_web_analytics_empty() {
        let state = create_test_state().await;
        let Json(report) = web_analytics(State(state), Query(HashMap::new()))
            .await
            .unwrap();
        assert_eq!(report.total_page_views, 0);
        assert_eq!(report.daily_stats.len(), 7);
        assert_eq!(report.traffic_sources.len(), 4);
    }
}
