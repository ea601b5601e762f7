use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use reading_core::ReportZone;
use reading_core::metrics::DeviceBreakdown;
use reading_core::time::fixed_now;
use services::{
    AnalyticsConfig, AnalyticsService, AppServices, Clock, DashboardState, StaticPage,
};
use storage::repository::{InMemoryStore, KeyValueStore, Storage, StorageError};
use storage::ANALYTICS_STORAGE_KEY;

fn config() -> AnalyticsConfig {
    AnalyticsConfig::default().with_report_zone(ReportZone::utc())
}

fn service_over(items: Arc<dyn KeyValueStore>, width: u32) -> AnalyticsService {
    AnalyticsService::new(
        Clock::fixed(fixed_now()),
        config(),
        items,
        Arc::new(StaticPage::new(width)),
    )
}

#[tokio::test]
async fn fresh_store_reads_empty() {
    let svc = service_over(Arc::new(InMemoryStore::new()), 1280);

    assert!(svc.get_all_analytics().await.is_empty());

    let metrics = svc.get_analytics_metrics().await;
    assert_eq!(metrics.total_views, 0);
    assert_eq!(metrics.unique_visitors, 0);
    assert!(metrics.average_reading_time.abs() < f64::EPSILON);
    assert!(metrics.top_articles.is_empty());
    assert_eq!(metrics.device_breakdown, DeviceBreakdown::default());
    assert_eq!(metrics.weekly_views.len(), 7);
    assert!(metrics.weekly_views.iter().all(|d| d.views == 0));
}

#[tokio::test]
async fn per_article_average_follows_session_reading_times() {
    let svc = service_over(Arc::new(InMemoryStore::new()), 1280);

    for reading_ms in [1000, 2000, 3000] {
        svc.restart_session();
        svc.advance_clock(Duration::milliseconds(reading_ms));
        svc.track_article_view("a", None).await;
    }

    let record = svc.get_article_analytics("a").await.expect("record exists");
    assert_eq!(record.views(), 3);
    assert_eq!(record.sessions().len(), 3);
    let times: Vec<u64> = record
        .sessions()
        .iter()
        .map(|s| s.reading_time_ms())
        .collect();
    assert_eq!(times, vec![1000, 2000, 3000]);

    let metrics = svc.get_analytics_metrics().await;
    let top = &metrics.top_articles[0];
    assert_eq!(top.slug, "a");
    assert_eq!(top.title, "A");
    assert!((top.average_reading_time - 2000.0).abs() < f64::EPSILON);
    assert_eq!(metrics.unique_visitors, 3);
    assert_eq!(metrics.weekly_views.last().unwrap().views, 3);
}

#[tokio::test]
async fn same_tab_views_share_one_visitor() {
    let svc = service_over(Arc::new(InMemoryStore::new()), 600);
    svc.track_article_view("first", None).await;
    svc.track_article_view("second", None).await;

    let metrics = svc.get_analytics_metrics().await;
    assert_eq!(metrics.total_views, 2);
    assert_eq!(metrics.unique_visitors, 1);
    assert_eq!(metrics.device_breakdown.mobile, 2);
}

#[tokio::test]
async fn clear_is_total() {
    let svc = service_over(Arc::new(InMemoryStore::new()), 1280);
    for slug in ["one", "two", "three"] {
        svc.track_article_view(slug, None).await;
    }
    assert_eq!(svc.get_all_analytics().await.len(), 3);

    svc.clear_analytics().await;

    for slug in ["one", "two", "three"] {
        assert!(svc.get_article_analytics(slug).await.is_none());
    }
    let metrics = svc.get_analytics_metrics().await;
    assert_eq!(metrics.total_views, 0);
    assert!(metrics.top_articles.is_empty());
}

#[tokio::test]
async fn top_articles_rank_by_views() {
    let svc = service_over(Arc::new(InMemoryStore::new()), 1280);
    for (slug, views) in [("five", 5), ("twenty-a", 20), ("one", 1), ("twenty-b", 20)] {
        for _ in 0..views {
            svc.track_article_view(slug, None).await;
        }
    }
    for i in 0..12 {
        svc.track_article_view(&format!("filler-{i}"), None).await;
    }

    let metrics = svc.get_analytics_metrics().await;
    let slugs: Vec<&str> = metrics.top_articles.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(metrics.top_articles.len(), 10);
    assert_eq!(&slugs[..3], &["twenty-a", "twenty-b", "five"]);
    assert_eq!(slugs[3], "one");
}

#[tokio::test]
async fn malformed_value_reads_as_empty_and_is_replaced() {
    let items = InMemoryStore::new();
    items
        .set_item(ANALYTICS_STORAGE_KEY, "definitely not json")
        .await
        .unwrap();
    let svc = service_over(Arc::new(items.clone()), 1280);

    assert!(svc.get_all_analytics().await.is_empty());
    svc.track_article_view("recovered", None).await;

    let record = svc.get_article_analytics("recovered").await.unwrap();
    assert_eq!(record.views(), 1);
    let raw = items.get_item(ANALYTICS_STORAGE_KEY).await.unwrap().unwrap();
    assert!(raw.starts_with('['));
}

#[tokio::test]
async fn invalid_stored_record_does_not_take_valid_ones_with_it() {
    let items = InMemoryStore::new();
    let stored = r#"[
        {
            "slug": "good",
            "views": 5,
            "lastViewed": "2023-11-14T10:00:00Z",
            "sessions": []
        },
        {
            "slug": "bad",
            "views": 1,
            "lastViewed": "2023-11-14T10:00:00Z",
            "sessions": [{
                "sessionId": "1699956000000-aaaaaaaaa",
                "startTime": "2023-11-14T10:00:00Z",
                "endTime": "2023-11-14T09:00:00Z",
                "scrollDepth": 20,
                "readingTime": 500,
                "device": "mobile"
            }]
        },
        {
            "slug": "   ",
            "views": 3,
            "lastViewed": "2023-11-14T10:00:00Z"
        }
    ]"#;
    items.set_item(ANALYTICS_STORAGE_KEY, stored).await.unwrap();
    let svc = service_over(Arc::new(items.clone()), 1280);

    assert_eq!(svc.get_all_analytics().await.len(), 2);
    svc.track_article_view("new", None).await;

    let good = svc.get_article_analytics("good").await.expect("good record kept");
    assert_eq!(good.views(), 5);
    let bad = svc.get_article_analytics("bad").await.expect("repaired record kept");
    assert_eq!(bad.sessions().len(), 1);
    assert!(bad.sessions()[0].end_time().is_none());
    assert_eq!(svc.get_all_analytics().await.len(), 3);

    let raw = items.get_item(ANALYTICS_STORAGE_KEY).await.unwrap().unwrap();
    assert!(raw.contains("\"good\""));
}

#[tokio::test]
async fn concurrent_views_are_not_lost() {
    let svc = Arc::new(service_over(Arc::new(InMemoryStore::new()), 1280));

    let mut handles = Vec::new();
    for _ in 0..25 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.track_article_view("hot", None).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record = svc.get_article_analytics("hot").await.unwrap();
    assert_eq!(record.views(), 25);
    assert_eq!(record.sessions().len(), 25);
}

/// Accepts reads but can be switched to reject writes.
#[derive(Clone, Default)]
struct ReadOnlySwitch {
    inner: InMemoryStore,
    read_only: Arc<AtomicBool>,
}

#[async_trait]
impl KeyValueStore for ReadOnlySwitch {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("quota exceeded".into()));
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("quota exceeded".into()));
        }
        self.inner.remove_item(key).await
    }
}

#[tokio::test]
async fn failed_writes_leave_previous_data() {
    let store = ReadOnlySwitch::default();
    let svc = service_over(Arc::new(store.clone()), 1280);
    svc.track_article_view("kept", None).await;

    store.read_only.store(true, Ordering::SeqCst);
    svc.track_article_view("kept", None).await;
    svc.clear_analytics().await;

    let record = svc.get_article_analytics("kept").await.unwrap();
    assert_eq!(record.views(), 1);
}

#[tokio::test]
async fn dashboard_moves_from_loading_to_empty_to_populated() {
    let services = AppServices::in_memory(
        Clock::fixed(fixed_now()),
        config(),
        Arc::new(StaticPage::new(900)),
    );
    let mut dashboard = services.dashboard();
    assert!(dashboard.is_loading());
    assert!(dashboard.metrics().is_none());

    dashboard.refresh().await;
    match dashboard.state() {
        DashboardState::Empty(metrics) => {
            assert_eq!(metrics.total_views, 0);
            assert_eq!(metrics.weekly_views.len(), 7);
        }
        other => panic!("expected empty dashboard, got {other:?}"),
    }

    services.analytics().track_article_view("hello-world", None).await;
    dashboard.refresh().await;
    assert!(dashboard.has_data());
    let metrics = dashboard.metrics().unwrap();
    assert_eq!(metrics.device_breakdown.tablet, 1);
    assert_eq!(metrics.top_articles[0].title, "Hello World");

    dashboard.clear().await;
    assert!(matches!(dashboard.state(), DashboardState::Empty(_)));
}

#[tokio::test]
async fn sqlite_backed_services_persist_between_instances() {
    let url = "sqlite:file:memdb_services_persist?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("connect sqlite");

    let first = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        config(),
        Arc::new(StaticPage::new(1280)),
    );
    first
        .analytics()
        .track_article_view("persisted", Some("Persisted Post"))
        .await;

    let second = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now() + Duration::hours(1)),
        config(),
        Arc::new(StaticPage::new(500)),
    );
    second.analytics().track_article_view("persisted", None).await;

    let record = second
        .analytics()
        .get_article_analytics("persisted")
        .await
        .unwrap();
    assert_eq!(record.views(), 2);
    assert_eq!(record.title(), Some("Persisted Post"));
    assert_eq!(record.last_viewed(), fixed_now() + Duration::hours(1));
    assert_ne!(
        record.sessions()[0].session_id(),
        record.sessions()[1].session_id()
    );
}
