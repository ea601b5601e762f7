use chrono::{DateTime, Utc};

use crate::model::{ArticleSlug, ReadingSession};

/// Per-article aggregate, keyed by slug.
///
/// `views` and `sessions` move together through `record_view`. Sessions are
/// kept in insertion order, which is also chronological view order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleAnalytics {
    slug: ArticleSlug,
    title: Option<String>,
    views: u64,
    last_viewed: DateTime<Utc>,
    sessions: Vec<ReadingSession>,
}

impl ArticleAnalytics {
    /// An empty record for a slug that has not been viewed yet.
    #[must_use]
    pub fn new(slug: ArticleSlug, created_at: DateTime<Utc>) -> Self {
        Self {
            slug,
            title: None,
            views: 0,
            last_viewed: created_at,
            sessions: Vec::new(),
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// A stored view count lower than the number of sessions cannot come from
    /// `record_view`; it is raised to the session count.
    #[must_use]
    pub fn from_persisted(
        slug: ArticleSlug,
        title: Option<String>,
        views: u64,
        last_viewed: DateTime<Utc>,
        sessions: Vec<ReadingSession>,
    ) -> Self {
        let session_count = u64::try_from(sessions.len()).unwrap_or(u64::MAX);
        let views = if views < session_count {
            tracing::warn!(
                slug = %slug,
                views,
                sessions = session_count,
                "stored view count below session count, repairing"
            );
            session_count
        } else {
            views
        };
        Self {
            slug,
            title: normalize_title(title),
            views,
            last_viewed,
            sessions,
        }
    }

    /// Count one view and append a snapshot of the viewing session.
    pub fn record_view(&mut self, session: ReadingSession, viewed_at: DateTime<Utc>) {
        self.views = self.views.saturating_add(1);
        self.last_viewed = viewed_at;
        self.sessions.push(session);
    }

    /// Remember a display title. Blank titles are ignored.
    pub fn set_title(&mut self, title: Option<&str>) {
        if let Some(title) = normalize_title(title.map(str::to_owned)) {
            self.title = Some(title);
        }
    }

    /// Drop the oldest sessions so at most `max` remain. `views` is untouched.
    pub fn retain_last_sessions(&mut self, max: usize) {
        if self.sessions.len() > max {
            let excess = self.sessions.len() - max;
            self.sessions.drain(..excess);
        }
    }

    #[must_use]
    pub fn slug(&self) -> &ArticleSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Tracked title, or the slug in title case.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.slug.title_case())
    }

    #[must_use]
    pub fn views(&self) -> u64 {
        self.views
    }

    #[must_use]
    pub fn last_viewed(&self) -> DateTime<Utc> {
        self.last_viewed
    }

    #[must_use]
    pub fn sessions(&self) -> &[ReadingSession] {
        &self.sessions
    }

    #[must_use]
    pub fn total_reading_time_ms(&self) -> u64 {
        self.sessions
            .iter()
            .map(ReadingSession::reading_time_ms)
            .fold(0_u64, u64::saturating_add)
    }

    /// Mean reading time over this article's sessions; 0 when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_reading_time_ms(&self) -> f64 {
        if self.sessions.is_empty() {
            return 0.0;
        }
        self.total_reading_time_ms() as f64 / self.sessions.len() as f64
    }

    /// Mean scroll depth over this article's sessions; 0 when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_scroll_depth(&self) -> f64 {
        if self.sessions.is_empty() {
            return 0.0;
        }
        let total: u64 = self
            .sessions
            .iter()
            .map(|s| u64::from(s.scroll_depth()))
            .sum();
        total as f64 / self.sessions.len() as f64
    }
}

fn normalize_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
