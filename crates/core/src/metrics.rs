//! Read-only rollups over the full set of article records.
//!
//! Everything here is recomputed from scratch on each call; nothing is cached.

use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::{ArticleAnalytics, Device, ReadingSession};
use crate::time::ReportZone;

/// Default length of the top-articles list.
pub const TOP_ARTICLES_LIMIT: usize = 10;
/// Number of calendar days in the weekly histogram.
pub const WEEKLY_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopArticle {
    pub slug: String,
    pub title: String,
    pub views: u64,
    pub average_reading_time: f64,
}

/// Session counts per device class. All three classes are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBreakdown {
    pub mobile: u64,
    pub tablet: u64,
    pub desktop: u64,
}

impl DeviceBreakdown {
    fn bump(&mut self, device: Device) {
        let slot = match device {
            Device::Mobile => &mut self.mobile,
            Device::Tablet => &mut self.tablet,
            Device::Desktop => &mut self.desktop,
        };
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyViews {
    pub date: NaiveDate,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub total_views: u64,
    pub unique_visitors: u64,
    pub average_reading_time: f64,
    pub top_articles: Vec<TopArticle>,
    pub device_breakdown: DeviceBreakdown,
    pub weekly_views: Vec<DailyViews>,
}

impl AnalyticsMetrics {
    /// True once at least one view has been recorded.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.total_views > 0
    }
}

/// Parameters that are not part of the stored data.
#[derive(Debug, Clone, Copy)]
pub struct MetricsWindow {
    pub today: NaiveDate,
    pub zone: ReportZone,
    pub top_limit: usize,
}

impl MetricsWindow {
    #[must_use]
    pub fn new(today: NaiveDate, zone: ReportZone) -> Self {
        Self {
            today,
            zone,
            top_limit: TOP_ARTICLES_LIMIT,
        }
    }

    #[must_use]
    pub fn with_top_limit(mut self, top_limit: usize) -> Self {
        self.top_limit = top_limit;
        self
    }
}

/// Compute every dashboard metric from the full record set.
#[must_use]
pub fn compute_metrics(records: &[ArticleAnalytics], window: MetricsWindow) -> AnalyticsMetrics {
    let sessions: Vec<&ReadingSession> = records.iter().flat_map(|r| r.sessions()).collect();

    let total_views = records
        .iter()
        .map(ArticleAnalytics::views)
        .fold(0_u64, u64::saturating_add);

    let unique_visitors = sessions
        .iter()
        .map(|s| s.session_id())
        .collect::<HashSet<_>>()
        .len();

    AnalyticsMetrics {
        total_views,
        unique_visitors: u64::try_from(unique_visitors).unwrap_or(u64::MAX),
        average_reading_time: mean_reading_time(&sessions),
        top_articles: top_articles(records, window.top_limit),
        device_breakdown: device_breakdown(&sessions),
        weekly_views: weekly_views(&sessions, window.today, window.zone),
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_reading_time(sessions: &[&ReadingSession]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let total = sessions
        .iter()
        .map(|s| s.reading_time_ms())
        .fold(0_u64, u64::saturating_add);
    total as f64 / sessions.len() as f64
}

/// Most viewed first; ties keep the order records were stored in.
#[must_use]
pub fn top_articles(records: &[ArticleAnalytics], limit: usize) -> Vec<TopArticle> {
    let mut ranked: Vec<TopArticle> = records
        .iter()
        .map(|record| TopArticle {
            slug: record.slug().to_string(),
            title: record.display_title(),
            views: record.views(),
            average_reading_time: record.average_reading_time_ms(),
        })
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.views.cmp(&a.views));
    ranked.truncate(limit);
    ranked
}

fn device_breakdown(sessions: &[&ReadingSession]) -> DeviceBreakdown {
    let mut breakdown = DeviceBreakdown::default();
    for session in sessions {
        breakdown.bump(session.device());
    }
    breakdown
}

/// Sessions started on each of the last seven calendar days, oldest first.
fn weekly_views(sessions: &[&ReadingSession], today: NaiveDate, zone: ReportZone) -> Vec<DailyViews> {
    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    for session in sessions {
        let slot = per_day.entry(zone.date_of(session.start_time())).or_default();
        *slot = slot.saturating_add(1);
    }

    (0..WEEKLY_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DailyViews {
            date,
            views: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
