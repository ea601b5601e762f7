use chrono::Duration;
use reading_core::ReportZone;
use reading_core::metrics::TOP_ARTICLES_LIMIT;
use storage::ANALYTICS_STORAGE_KEY;

/// Quiet period before a burst of scroll events is measured.
pub const DEFAULT_SCROLL_DEBOUNCE_MS: i64 = 100;

/// Tunables for the analytics service.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub scroll_debounce: Duration,
    pub top_articles_limit: usize,
    /// Keep at most this many sessions per article. `None` keeps everything.
    pub max_sessions_per_article: Option<usize>,
    pub report_zone: ReportZone,
    pub storage_key: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            scroll_debounce: Duration::milliseconds(DEFAULT_SCROLL_DEBOUNCE_MS),
            top_articles_limit: TOP_ARTICLES_LIMIT,
            max_sessions_per_article: None,
            report_zone: ReportZone::Local,
            storage_key: ANALYTICS_STORAGE_KEY.to_owned(),
        }
    }
}

impl AnalyticsConfig {
    /// Defaults overridden by `READING_TZ` and `READING_MAX_SESSIONS`.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(zone) = std::env::var("READING_TZ")
            .ok()
            .and_then(|raw| ReportZone::parse(&raw))
        {
            config.report_zone = zone;
        }
        if let Some(max) = std::env::var("READING_MAX_SESSIONS")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|max| *max > 0)
        {
            config.max_sessions_per_article = Some(max);
        }
        config
    }

    #[must_use]
    pub fn with_report_zone(mut self, zone: ReportZone) -> Self {
        self.report_zone = zone;
        self
    }

    #[must_use]
    pub fn with_max_sessions_per_article(mut self, max: Option<usize>) -> Self {
        self.max_sessions_per_article = max;
        self
    }
}
