use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;

use reading_core::metrics::{AnalyticsMetrics, MetricsWindow, compute_metrics};
use reading_core::model::{ArticleAnalytics, ArticleSlug, ReadingSession, ScrollSample};
use storage::records::ArticleRecordStore;
use storage::repository::KeyValueStore;

use crate::Clock;
use crate::config::AnalyticsConfig;
use crate::environment::{PageEnvironment, Visibility};
use crate::error::AnalyticsServiceError;
use crate::tracker::SessionTracker;

/// Reading analytics for one browsing context.
///
/// Owns the live session of the current page and the persisted per-article
/// records. No method returns an error: storage problems are logged and the
/// call becomes a no-op or yields an empty result.
pub struct AnalyticsService {
    clock: Mutex<Clock>,
    config: AnalyticsConfig,
    page: Arc<dyn PageEnvironment>,
    records: ArticleRecordStore,
    tracker: Mutex<SessionTracker>,
    // Serializes read-modify-write cycles on the stored collection.
    write_lock: AsyncMutex<()>,
}

impl AnalyticsService {
    /// Create the service and start a session for `page`.
    #[must_use]
    pub fn new(
        clock: Clock,
        config: AnalyticsConfig,
        items: Arc<dyn KeyValueStore>,
        page: Arc<dyn PageEnvironment>,
    ) -> Self {
        let records = ArticleRecordStore::with_key(items, config.storage_key.clone());
        let tracker = SessionTracker::start(page.as_ref(), clock.now(), config.scroll_debounce);
        Self {
            clock: Mutex::new(clock),
            config,
            page,
            records,
            tracker: Mutex::new(tracker),
            write_lock: AsyncMutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now()
    }

    fn tracker(&self) -> MutexGuard<'_, SessionTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move a fixed clock forward. Has no effect on the system clock.
    pub fn advance_clock(&self, delta: Duration) {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(delta);
    }

    // ─── Page events ───────────────────────────────────────────────────────────

    pub fn handle_scroll(&self, sample: ScrollSample) {
        let now = self.now();
        self.tracker().on_scroll(sample, now);
    }

    pub fn handle_visibility(&self, visibility: Visibility) {
        let now = self.now();
        self.tracker().on_visibility_change(visibility, now);
    }

    /// Measure a scroll sample whose debounce window has passed.
    pub fn tick(&self) {
        let now = self.now();
        self.tracker().tick(now);
    }

    /// Close the live session at page unload. The session is not stored again.
    pub fn finalize_session(&self) {
        let now = self.now();
        self.tracker().finalize(now);
    }

    /// Close the live session and start a new one, as on a full page load.
    pub fn restart_session(&self) {
        let now = self.now();
        let mut tracker = self.tracker();
        tracker.finalize(now);
        *tracker = SessionTracker::start(self.page.as_ref(), now, self.config.scroll_debounce);
    }

    /// The live session, if the page environment allows tracking.
    #[must_use]
    pub fn current_session(&self) -> Option<ReadingSession> {
        self.tracker().session().cloned()
    }

    // ─── Records ───────────────────────────────────────────────────────────────

    /// Count a view of `slug` and store a copy of the live session with it.
    pub async fn track_article_view(&self, slug: &str, title: Option<&str>) {
        if let Err(err) = self.try_track_article_view(slug, title).await {
            tracing::warn!(slug, error = %err, "failed to track article view");
        }
    }

    async fn try_track_article_view(
        &self,
        slug: &str,
        title: Option<&str>,
    ) -> Result<(), AnalyticsServiceError> {
        let slug = ArticleSlug::new(slug)?;
        let now = self.now();
        let snapshot = self.tracker().snapshot(now);
        let Some(snapshot) = snapshot else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let mut articles = self.records.load().await?;
        let index = match articles.iter().position(|a| a.slug() == &slug) {
            Some(index) => index,
            None => {
                articles.push(ArticleAnalytics::new(slug.clone(), now));
                articles.len() - 1
            }
        };

        let article = &mut articles[index];
        article.set_title(title);
        article.record_view(snapshot, now);
        if let Some(max) = self.config.max_sessions_per_article {
            article.retain_last_sessions(max);
        }
        let views = article.views();

        self.records.save(&articles).await?;
        tracing::debug!(slug = %slug, views, "tracked article view");
        Ok(())
    }

    /// The record for `slug`, or `None` if it has never been viewed.
    pub async fn get_article_analytics(&self, slug: &str) -> Option<ArticleAnalytics> {
        let slug = ArticleSlug::new(slug).ok()?;
        self.get_all_analytics()
            .await
            .into_iter()
            .find(|a| a.slug() == &slug)
    }

    /// Every stored record, in stored order.
    pub async fn get_all_analytics(&self) -> Vec<ArticleAnalytics> {
        match self.records.load().await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!(error = %err, "analytics storage unreadable");
                Vec::new()
            }
        }
    }

    /// Rollups over every stored record, computed fresh.
    pub async fn get_analytics_metrics(&self) -> AnalyticsMetrics {
        let articles = self.get_all_analytics().await;
        let today = self.config.report_zone.date_of(self.now());
        let window = MetricsWindow::new(today, self.config.report_zone)
            .with_top_limit(self.config.top_articles_limit);
        compute_metrics(&articles, window)
    }

    /// Remove every stored record.
    pub async fn clear_analytics(&self) {
        let _guard = self.write_lock.lock().await;
        match self.records.clear().await {
            Ok(()) => tracing::debug!("cleared analytics"),
            Err(err) => tracing::warn!(error = %err, "failed to clear analytics"),
        }
    }
}
