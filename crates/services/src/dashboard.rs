use std::sync::Arc;

use reading_core::metrics::AnalyticsMetrics;

use crate::analytics_service::AnalyticsService;

/// What the dashboard shows. There is no error state: unreadable data is empty data.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Loading,
    Empty(AnalyticsMetrics),
    Populated(AnalyticsMetrics),
}

impl DashboardState {
    fn from_metrics(metrics: AnalyticsMetrics) -> Self {
        if metrics.has_data() {
            Self::Populated(metrics)
        } else {
            Self::Empty(metrics)
        }
    }
}

/// Presentation-side holder for dashboard metrics.
pub struct DashboardModel {
    analytics: Arc<AnalyticsService>,
    state: DashboardState,
}

impl DashboardModel {
    /// Starts in `Loading` until the first `refresh`.
    #[must_use]
    pub fn new(analytics: Arc<AnalyticsService>) -> Self {
        Self {
            analytics,
            state: DashboardState::Loading,
        }
    }

    #[must_use]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    #[must_use]
    pub fn metrics(&self) -> Option<&AnalyticsMetrics> {
        match &self.state {
            DashboardState::Loading => None,
            DashboardState::Empty(m) | DashboardState::Populated(m) => Some(m),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.state, DashboardState::Loading)
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        matches!(self.state, DashboardState::Populated(_))
    }

    /// Recompute metrics from storage.
    pub async fn refresh(&mut self) {
        let metrics = self.analytics.get_analytics_metrics().await;
        self.state = DashboardState::from_metrics(metrics);
    }

    /// Wipe every stored record, then reload.
    pub async fn clear(&mut self) {
        self.analytics.clear_analytics().await;
        self.refresh().await;
    }
}
