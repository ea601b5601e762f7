use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reading_core::model::ScrollSample;
use services::{AnalyticsConfig, AnalyticsService, Clock, StaticPage};
use storage::repository::Storage;

const ARTICLES: [(&str, &str); 5] = [
    ("getting-started-with-rust", "Getting Started with Rust"),
    ("async-in-practice", "Async in Practice"),
    ("designing-error-types", "Designing Error Types"),
    ("sqlite-for-small-apps", "SQLite for Small Apps"),
    ("notes-on-ownership", "Notes on Ownership"),
];

const VIEWPORTS: [u32; 3] = [390, 820, 1440];

/// Record `visits` demo page visits spread over the last seven days.
pub async fn seed_visits(
    storage: &Storage,
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
    visits: u32,
) -> u32 {
    for i in 0..visits {
        let idx = usize::try_from(i).unwrap_or(0);
        let (slug, title) = ARTICLES[idx % ARTICLES.len()];
        let width = VIEWPORTS[idx % VIEWPORTS.len()];
        let opened_at = now - Duration::days(i64::from(i % 7)) - Duration::minutes(10);

        let visit = AnalyticsService::new(
            Clock::fixed(opened_at),
            config.clone(),
            Arc::clone(&storage.items),
            Arc::new(StaticPage::new(width)),
        );
        let depth = f64::from((i * 37) % 101);
        visit.handle_scroll(ScrollSample::new(depth * 20.0, 2800.0, 800.0));
        visit.advance_clock(Duration::seconds(30 * i64::from(i % 5 + 1)));
        visit.tick();
        visit.track_article_view(slug, Some(title)).await;
        visit.finalize_session();
    }
    tracing::info!(visits, "seeded demo analytics");
    visits
}

#[cfg(test)]
mod tests {
    use super::*;
    use reading_core::ReportZone;
    use reading_core::time::fixed_now;

    #[tokio::test]
    async fn seeded_visits_cover_the_week() {
        let storage = Storage::in_memory();
        let config = AnalyticsConfig::default().with_report_zone(ReportZone::utc());
        let count = seed_visits(&storage, &config, fixed_now(), 14).await;
        assert_eq!(count, 14);

        let analytics = AnalyticsService::new(
            Clock::fixed(fixed_now()),
            config,
            Arc::clone(&storage.items),
            Arc::new(services::ServerRender),
        );
        let metrics = analytics.get_analytics_metrics().await;
        assert_eq!(metrics.total_views, 14);
        assert_eq!(metrics.top_articles.len(), 5);
        assert!(metrics.weekly_views.iter().all(|d| d.views == 2));
        assert_eq!(
            metrics.device_breakdown.mobile
                + metrics.device_breakdown.tablet
                + metrics.device_breakdown.desktop,
            14
        );
    }
}
