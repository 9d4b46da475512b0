//! Analytics capture and reporting
//!
//! Builds event records from tracking requests and aggregates stored page
//! views into the web analytics report.

use crate::db::models::{format_timestamp, parse_timestamp, AnalyticsEvent};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Event type recorded for page views
pub const PAGE_VIEW: &str = "page_view";

/// How long events are kept (days)
pub const EVENT_TTL_DAYS: i64 = 365;

const SEARCH_ENGINES: &[&str] = &[
    "google.", "bing.", "duckduckgo.", "yahoo.", "baidu.", "yandex.", "ecosia.",
];

const SOCIAL_HOSTS: &[&str] = &[
    "twitter.com", "x.com", "t.co", "facebook.", "fb.", "linkedin.", "lnkd.in", "reddit.",
    "instagram.", "youtube.", "news.ycombinator.com", "mastodon.",
];

/// Body of a tracking request
#[derive(Debug, Default, Deserialize)]
pub struct TrackEventRequest {
    /// Event type, defaults to "page_view"
    pub event_type: Option<String>,
    /// Viewed path, defaults to "/"
    pub page_path: Option<String>,
    /// Viewed page title
    pub page_title: Option<String>,
    /// Referrer URL
    pub referrer: Option<String>,
    /// Client session id; generated when absent
    pub session_id: Option<String>,
    /// Authenticated user id
    pub user_id: Option<String>,
}

/// Request metadata captured alongside an event
#[derive(Debug, Default, Clone)]
pub struct ClientInfo {
    /// User-Agent header
    pub user_agent: String,
    /// Client IP address
    pub ip_address: String,
}

/// Build the stored record for a tracking request
pub fn build_event(
    request: TrackEventRequest,
    client: ClientInfo,
    now: DateTime<Utc>,
) -> AnalyticsEvent {
    fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    AnalyticsEvent {
        id: Uuid::new_v4().to_string(),
        timestamp: format_timestamp(now),
        date: now.format("%Y-%m-%d").to_string(),
        hour: now.format("%Y-%m-%d-%H").to_string(),
        event_type: non_empty(request.event_type).unwrap_or_else(|| PAGE_VIEW.to_string()),
        page_path: non_empty(request.page_path).unwrap_or_else(|| "/".to_string()),
        page_title: request.page_title.unwrap_or_default(),
        user_agent: client.user_agent,
        ip_address: client.ip_address,
        referrer: request.referrer.unwrap_or_default(),
        session_id: non_empty(request.session_id).unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: non_empty(request.user_id),
        ttl: (now + Duration::days(EVENT_TTL_DAYS)).timestamp(),
    }
}

/// Reporting window selected by the `range` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    /// 1d
    Day,
    /// 7d
    Week,
    /// 30d
    Month,
    /// 90d
    Quarter,
}

impl DateRange {
    /// Parse a range such as "30d", falling back to 7 days
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("1d") => DateRange::Day,
            Some("30d") => DateRange::Month,
            Some("90d") => DateRange::Quarter,
            _ => DateRange::Week,
        }
    }

    /// Number of days covered
    pub fn days(&self) -> i64 {
        match self {
            DateRange::Day => 1,
            DateRange::Week => 7,
            DateRange::Month => 30,
            DateRange::Quarter => 90,
        }
    }

    /// Current window `[from, to)` and the preceding window of equal length
    ///
    /// The current window starts at midnight UTC of the oldest day in the
    /// range, so it covers exactly the calendar days reported in `dailyStats`.
    pub fn windows(&self, now: DateTime<Utc>) -> ((String, String), (String, String)) {
        let span = Duration::days(self.days());
        let to = now + Duration::seconds(1);
        let from = (now - Duration::days(self.days() - 1))
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let previous_from = from - span;
        (
            (format_timestamp(from), format_timestamp(to)),
            (format_timestamp(previous_from), format_timestamp(from)),
        )
    }
}

/// Where a visit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficSource {
    /// Search engine result
    OrganicSearch,
    /// No referrer
    Direct,
    /// Social network link
    SocialMedia,
    /// Any other site
    Referral,
}

impl TrafficSource {
    /// Report ordering
    pub const ALL: [TrafficSource; 4] = [
        TrafficSource::OrganicSearch,
        TrafficSource::Direct,
        TrafficSource::SocialMedia,
        TrafficSource::Referral,
    ];

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            TrafficSource::OrganicSearch => "Organic Search",
            TrafficSource::Direct => "Direct",
            TrafficSource::SocialMedia => "Social Media",
            TrafficSource::Referral => "Referral",
        }
    }
}

/// Classify a referrer URL
pub fn classify_referrer(referrer: &str) -> TrafficSource {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return TrafficSource::Direct;
    }

    let without_scheme = referrer
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(referrer);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let matches = |patterns: &[&str]| {
        patterns.iter().any(|p| {
            if p.ends_with('.') {
                host.starts_with(p) || host.contains(&format!(".{}", p))
            } else {
                host == *p || host.ends_with(&format!(".{}", p))
            }
        })
    };

    if matches(SEARCH_ENGINES) {
        TrafficSource::OrganicSearch
    } else if matches(SOCIAL_HOSTS) {
        TrafficSource::SocialMedia
    } else {
        TrafficSource::Referral
    }
}

/// Headline numbers for one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSummary {
    /// Number of page views
    pub page_views: usize,
    /// Distinct sessions
    pub visitors: usize,
    /// Mean first-to-last event span per session (seconds)
    pub avg_session_secs: f64,
    /// Share of single-view sessions (percent)
    pub bounce_rate: f64,
}

/// Group events by session, preserving timestamp order within each session
fn sessions(events: &[AnalyticsEvent]) -> HashMap<&str, Vec<&AnalyticsEvent>> {
    let mut sessions: HashMap<&str, Vec<&AnalyticsEvent>> = HashMap::new();
    for event in events {
        sessions
            .entry(event.session_id.as_str())
            .or_default()
            .push(event);
    }
    for session in sessions.values_mut() {
        session.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }
    sessions
}

/// Summarize a window of page-view events
pub fn summarize(events: &[AnalyticsEvent]) -> WindowSummary {
    let sessions = sessions(events);
    if sessions.is_empty() {
        return WindowSummary::default();
    }

    let mut total_secs = 0i64;
    let mut bounces = 0usize;
    for session in sessions.values() {
        if session.len() == 1 {
            bounces += 1;
        }
        let first = session.first().and_then(|e| parse_timestamp(&e.timestamp));
        let last = session.last().and_then(|e| parse_timestamp(&e.timestamp));
        if let (Some(first), Some(last)) = (first, last) {
            total_secs += (last - first).num_seconds().max(0);
        }
    }

    let count = sessions.len() as f64;
    WindowSummary {
        page_views: events.len(),
        visitors: sessions.len(),
        avg_session_secs: total_secs as f64 / count,
        bounce_rate: bounces as f64 * 100.0 / count,
    }
}

/// Format seconds as `{m}m {s}s`
pub fn format_duration(secs: f64) -> String {
    let secs = secs.round().max(0.0) as u64;
    format!("{}m {}s", secs / 60, secs % 60)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Change between two windows
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Trend {
    /// Absolute percentage change, one decimal
    pub value: f64,
    /// "up", "down" or "flat"
    pub trend: &'static str,
}

impl Trend {
    /// Percentage change from `previous` to `current`
    pub fn between(previous: f64, current: f64) -> Self {
        let change = if previous > 0.0 {
            (current - previous) * 100.0 / previous
        } else if current > 0.0 {
            100.0
        } else {
            0.0
        };
        let change = round1(change);
        let trend = if change > 0.0 {
            "up"
        } else if change < 0.0 {
            "down"
        } else {
            "flat"
        };
        Self {
            value: change.abs(),
            trend,
        }
    }
}

/// Window-over-window trends
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    /// Page view change
    pub page_views: Trend,
    /// Visitor change
    pub visitors: Trend,
    /// Session duration change
    pub session_duration: Trend,
    /// Bounce rate change
    pub bounce_rate: Trend,
}

/// One row of the top pages table
#[derive(Debug, Clone, Serialize)]
pub struct TopPage {
    /// Page path
    pub path: String,
    /// Views in the window
    pub views: usize,
    /// Most recent title seen for the page
    pub title: String,
}

/// One row of the traffic sources table
#[derive(Debug, Clone, Serialize)]
pub struct TrafficSourceStat {
    /// Source label
    pub source: &'static str,
    /// Sessions from this source
    pub visitors: usize,
    /// Share of sessions, one decimal
    pub percentage: f64,
}

/// Views and visitors on one day
#[derive(Debug, Clone, Serialize)]
pub struct DailyStat {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Page views
    pub views: usize,
    /// Distinct sessions
    pub visitors: usize,
}

/// Response of `GET /api/analytics`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAnalyticsReport {
    /// Page views in the window
    pub total_page_views: usize,
    /// Distinct sessions in the window
    pub unique_visitors: usize,
    /// Mean session length, `{m}m {s}s`
    pub avg_session_duration: String,
    /// Share of single-view sessions, `{:.1}%`
    pub bounce_rate: String,
    /// Five most viewed pages
    pub top_pages: Vec<TopPage>,
    /// Sessions by referrer class
    pub traffic_sources: Vec<TrafficSourceStat>,
    /// One entry per day in the window, oldest first
    pub daily_stats: Vec<DailyStat>,
    /// Change against the preceding window
    pub trends: Trends,
}

/// Sessions per traffic source, classified by each session's landing referrer
pub fn traffic_sources(events: &[AnalyticsEvent]) -> Vec<TrafficSourceStat> {
    let sessions = sessions(events);
    let mut counts: HashMap<TrafficSource, usize> = HashMap::new();
    for session in sessions.values() {
        if let Some(first) = session.first() {
            *counts.entry(classify_referrer(&first.referrer)).or_default() += 1;
        }
    }

    let total = sessions.len();
    TrafficSource::ALL
        .iter()
        .map(|source| {
            let visitors = counts.get(source).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                round1(visitors as f64 * 100.0 / total as f64)
            };
            TrafficSourceStat {
                source: source.label(),
                visitors,
                percentage,
            }
        })
        .collect()
}

fn top_pages(events: &[AnalyticsEvent], limit: usize) -> Vec<TopPage> {
    let mut pages: HashMap<&str, (usize, &str)> = HashMap::new();
    for event in events {
        let entry = pages.entry(event.page_path.as_str()).or_insert((0, ""));
        entry.0 += 1;
        if !event.page_title.is_empty() {
            entry.1 = event.page_title.as_str();
        }
    }

    let mut pages: Vec<TopPage> = pages
        .into_iter()
        .map(|(path, (views, title))| TopPage {
            path: path.to_string(),
            views,
            title: title.to_string(),
        })
        .collect();
    pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.path.cmp(&b.path)));
    pages.truncate(limit);
    pages
}

fn daily_stats(events: &[AnalyticsEvent], days: i64, now: DateTime<Utc>) -> Vec<DailyStat> {
    let mut by_date: HashMap<&str, (usize, HashSet<&str>)> = HashMap::new();
    for event in events {
        let entry = by_date.entry(event.date.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(event.session_id.as_str());
    }

    (0..days)
        .map(|i| {
            let date = (now - Duration::days(days - 1 - i))
                .format("%Y-%m-%d")
                .to_string();
            let (views, visitors) = by_date
                .get(date.as_str())
                .map(|(views, sessions)| (*views, sessions.len()))
                .unwrap_or((0, 0));
            DailyStat {
                date,
                views,
                visitors,
            }
        })
        .collect()
}

/// Build the web analytics report
///
/// `current` and `previous` hold the page views of the reporting window and
/// the window immediately before it.
pub fn build_report(
    current: &[AnalyticsEvent],
    previous: &[AnalyticsEvent],
    range: DateRange,
    now: DateTime<Utc>,
) -> WebAnalyticsReport {
    let now_summary = summarize(current);
    let before = summarize(previous);

    WebAnalyticsReport {
        total_page_views: now_summary.page_views,
        unique_visitors: now_summary.visitors,
        avg_session_duration: format_duration(now_summary.avg_session_secs),
        bounce_rate: format!("{:.1}%", now_summary.bounce_rate),
        top_pages: top_pages(current, 5),
        traffic_sources: traffic_sources(current),
        daily_stats: daily_stats(current, range.days(), now),
        trends: Trends {
            page_views: Trend::between(before.page_views as f64, now_summary.page_views as f64),
            visitors: Trend::between(before.visitors as f64, now_summary.visitors as f64),
            session_duration: Trend::between(
                before.avg_session_secs,
                now_summary.avg_session_secs,
            ),
            bounce_rate: Trend::between(before.bounce_rate, now_summary.bounce_rate),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn view(session: &str, at: DateTime<Utc>, path: &str, referrer: &str) -> AnalyticsEvent {
        let mut event = build_event(
            TrackEventRequest {
                page_path: Some(path.to_string()),
                page_title: Some(format!("Title {}", path)),
                referrer: Some(referrer.to_string()),
                session_id: Some(session.to_string()),
                ..Default::default()
            },
            ClientInfo::default(),
            at,
        );
        event.id = format!("{}-{}", session, at.timestamp());
        event
    }

    #[test]
    fn test_build_event_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 5, 0).unwrap();
        let event = build_event(
            TrackEventRequest::default(),
            ClientInfo {
                user_agent: "curl".to_string(),
                ip_address: "10.0.0.1".to_string(),
            },
            now,
        );
        assert_eq!(event.event_type, PAGE_VIEW);
        assert_eq!(event.page_path, "/");
        assert_eq!(event.date, "2024-06-01");
        assert_eq!(event.hour, "2024-06-01-13");
        assert_eq!(event.user_agent, "curl");
        assert!(!event.session_id.is_empty());
        assert!(event.user_id.is_none());
        assert_eq!(event.ttl, now.timestamp() + 365 * 24 * 60 * 60);
    }

    #[test]
    fn test_date_range_parse() {
        assert_eq!(DateRange::parse(Some("1d")).days(), 1);
        assert_eq!(DateRange::parse(Some("90d")).days(), 90);
        assert_eq!(DateRange::parse(Some("12y")), DateRange::Week);
        assert_eq!(DateRange::parse(None), DateRange::Week);
    }

    #[test]
    fn test_classify_referrer() {
        assert_eq!(classify_referrer(""), TrafficSource::Direct);
        assert_eq!(
            classify_referrer("https://www.google.com/search?q=rust"),
            TrafficSource::OrganicSearch
        );
        assert_eq!(
            classify_referrer("https://news.ycombinator.com/item?id=1"),
            TrafficSource::SocialMedia
        );
        assert_eq!(classify_referrer("https://t.co/abc"), TrafficSource::SocialMedia);
        assert_eq!(
            classify_referrer("https://blog.example.org/post"),
            TrafficSource::Referral
        );
        // Host boundary: not a social host
        assert_eq!(classify_referrer("https://notx.com/"), TrafficSource::Referral);
    }

    #[test]
    fn test_summarize_sessions() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let events = vec![
            view("a", t0, "/", ""),
            view("a", t0 + Duration::seconds(90), "/blog/x", ""),
            view("b", t0, "/", ""),
        ];
        let summary = summarize(&events);
        assert_eq!(summary.page_views, 3);
        assert_eq!(summary.visitors, 2);
        assert_eq!(summary.avg_session_secs, 45.0);
        assert_eq!(summary.bounce_rate, 50.0);
        assert_eq!(format_duration(summary.avg_session_secs), "0m 45s");
        assert_eq!(format_duration(222.0), "3m 42s");
    }

    #[test]
    fn test_trend_between() {
        assert_eq!(
            Trend::between(100.0, 112.5),
            Trend {
                value: 12.5,
                trend: "up"
            }
        );
        assert_eq!(Trend::between(10.0, 5.0).trend, "down");
        assert_eq!(Trend::between(0.0, 0.0).trend, "flat");
        assert_eq!(Trend::between(0.0, 3.0).value, 100.0);
    }

    #[test]
    fn test_build_report() {
        let now = Utc.with_ymd_and_hms(2024, 6, 7, 12, 0, 0).unwrap();
        let yesterday = now - Duration::days(1);
        let current = vec![
            view("s1", yesterday, "/blog/a", "https://www.google.com/"),
            view("s1", yesterday + Duration::seconds(30), "/blog/b", ""),
            view("s2", now, "/blog/a", ""),
        ];
        let previous = vec![view("s0", now - Duration::days(9), "/", "")];

        let report = build_report(&current, &previous, DateRange::Week, now);
        assert_eq!(report.total_page_views, 3);
        assert_eq!(report.unique_visitors, 2);
        assert_eq!(report.bounce_rate, "50.0%");
        assert_eq!(report.top_pages[0].path, "/blog/a");
        assert_eq!(report.top_pages[0].views, 2);
        assert_eq!(report.top_pages[0].title, "Title /blog/a");

        assert_eq!(report.daily_stats.len(), 7);
        assert_eq!(report.daily_stats[6].date, "2024-06-07");
        assert_eq!(report.daily_stats[6].views, 1);
        assert_eq!(report.daily_stats[5].views, 2);
        assert_eq!(report.daily_stats[5].visitors, 1);
        assert_eq!(report.daily_stats[0].views, 0);

        let organic = &report.traffic_sources[0];
        assert_eq!(organic.source, "Organic Search");
        assert_eq!(organic.visitors, 1);
        assert_eq!(organic.percentage, 50.0);

        assert_eq!(report.trends.page_views.trend, "up");
        assert_eq!(report.trends.page_views.value, 200.0);
    }

    fn in_window(events: &[AnalyticsEvent], window: &(String, String)) -> Vec<AnalyticsEvent> {
        events
            .iter()
            .filter(|e| e.timestamp >= window.0 && e.timestamp < window.1)
            .cloned()
            .collect()
    }

    #[test]
    fn test_windows_align_to_calendar_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 7, 1, 0, 0).unwrap();
        let ((from, to), (previous_from, previous_to)) = DateRange::Day.windows(now);
        assert!(from.starts_with("2024-06-07T00:00:00"));
        assert!(to.starts_with("2024-06-07T01:00:01"));
        assert!(previous_from.starts_with("2024-06-06T00:00:00"));
        assert_eq!(previous_to, from);

        let ((from, _), _) = DateRange::Week.windows(now);
        assert!(from.starts_with("2024-06-01T00:00:00"));
    }

    #[test]
    fn test_daily_stats_account_for_every_view() {
        let now = Utc.with_ymd_and_hms(2024, 6, 7, 1, 0, 0).unwrap();
        let events = vec![
            view("late", now - Duration::hours(5), "/", ""),
            view("early", now - Duration::minutes(30), "/blog/a", ""),
            view("early", now, "/blog/b", ""),
        ];

        for range in [DateRange::Day, DateRange::Week, DateRange::Month] {
            let (current, previous) = range.windows(now);
            let report = build_report(
                &in_window(&events, &current),
                &in_window(&events, &previous),
                range,
                now,
            );
            let daily_sum: usize = report.daily_stats.iter().map(|d| d.views).sum();
            assert_eq!(daily_sum, report.total_page_views, "range {:?}", range);
        }

        // The view from the previous evening belongs to yesterday's window
        let (current, previous) = DateRange::Day.windows(now);
        assert_eq!(in_window(&events, &current).len(), 2);
        assert_eq!(in_window(&events, &previous).len(), 1);
    }

    #[test]
    fn test_empty_report() {
        let now = Utc.with_ymd_and_hms(2024, 6, 7, 12, 0, 0).unwrap();
        let report = build_report(&[], &[], DateRange::Day, now);
        assert_eq!(report.total_page_views, 0);
        assert_eq!(report.avg_session_duration, "0m 0s");
        assert_eq!(report.bounce_rate, "0.0%");
        assert_eq!(report.daily_stats.len(), 1);
        assert!(report.top_pages.is_empty());
        assert!(report.traffic_sources.iter().all(|s| s.percentage == 0.0));
    }
}
