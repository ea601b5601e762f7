use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::analytics_service::AnalyticsService;
use crate::config::AnalyticsConfig;
use crate::dashboard::DashboardModel;
use crate::environment::PageEnvironment;
use crate::error::AppServicesError;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: AnalyticsConfig,
        page: Arc<dyn PageEnvironment>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config, page))
    }

    /// Build services over an in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, config: AnalyticsConfig, page: Arc<dyn PageEnvironment>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, config, page)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: AnalyticsConfig,
        page: Arc<dyn PageEnvironment>,
    ) -> Self {
        let analytics = Arc::new(AnalyticsService::new(
            clock,
            config,
            Arc::clone(&storage.items),
            page,
        ));
        Self { analytics }
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }

    #[must_use]
    pub fn dashboard(&self) -> DashboardModel {
        DashboardModel::new(Arc::clone(&self.analytics))
    }
}
