//! Shared error types for the services crate.

use thiserror::Error;

use reading_core::model::SlugError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Internal failures of `AnalyticsService`.
///
/// These never cross the service's public methods; they are logged and the
/// call degrades to a no-op or an empty result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub(crate) enum AnalyticsServiceError {
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
