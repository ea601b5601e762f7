#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod config;
pub mod dashboard;
pub mod environment;
pub mod error;
pub mod tracker;

pub use reading_core::Clock;

pub use analytics_service::AnalyticsService;
pub use app_services::AppServices;
pub use config::AnalyticsConfig;
pub use dashboard::{DashboardModel, DashboardState};
pub use environment::{PageEnvironment, ServerRender, StaticPage, Visibility};
pub use error::AppServicesError;
pub use tracker::SessionTracker;
