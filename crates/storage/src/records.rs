//! Persisted shape of the article analytics collection.
//!
//! The whole collection lives as one JSON array under a single well-known key.
//! Timestamps are RFC 3339 text and are parsed back into `DateTime<Utc>` on
//! every read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reading_core::model::{ArticleAnalytics, ArticleSlug, Device, ReadingSession, SessionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{KeyValueStore, StorageError};

/// Key holding the JSON array of article records.
pub const ANALYTICS_STORAGE_KEY: &str = "article_analytics";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordCodecError {
    #[error("malformed analytics json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid analytics record: {0}")]
    Invalid(#[from] reading_core::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    session_id: String,
    start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    scroll_depth: Option<f64>,
    #[serde(default)]
    reading_time: Option<f64>,
    device: Device,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referrer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRecord {
    slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    views: u64,
    // Written for readers of the raw value; recomputed from sessions on load.
    #[serde(default)]
    total_reading_time: u64,
    #[serde(default)]
    average_scroll_depth: f64,
    last_viewed: DateTime<Utc>,
    #[serde(default)]
    sessions: Vec<SessionRecord>,
}

/// Stored numbers may come from a loosely typed writer; anything negative,
/// fractional or non-finite is normalized here.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_non_negative(value: Option<f64>, max: f64) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round().min(max) as u64,
        _ => 0,
    }
}

impl SessionRecord {
    fn from_session(session: &ReadingSession) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let reading_time = session.reading_time_ms() as f64;
        Self {
            session_id: session.session_id().as_str().to_owned(),
            start_time: session.start_time(),
            end_time: session.end_time(),
            scroll_depth: Some(f64::from(session.scroll_depth())),
            reading_time: Some(reading_time),
            device: session.device(),
            referrer: session.referrer().map(str::to_owned),
        }
    }

    fn into_session(self) -> Result<ReadingSession, reading_core::Error> {
        let scroll_depth = u8::try_from(whole_non_negative(self.scroll_depth, 100.0)).unwrap_or(100);
        #[allow(clippy::cast_precision_loss)]
        let reading_time = whole_non_negative(self.reading_time, u64::MAX as f64);
        let end_time = match self.end_time {
            Some(end) if end < self.start_time => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "stored session ends before it starts; dropping end time"
                );
                None
            }
            other => other,
        };
        let session = ReadingSession::from_persisted(
            SessionId::new(self.session_id),
            self.start_time,
            end_time,
            scroll_depth,
            reading_time,
            self.device,
            self.referrer,
        )?;
        Ok(session)
    }
}

impl ArticleRecord {
    fn from_article(article: &ArticleAnalytics) -> Self {
        Self {
            slug: article.slug().as_str().to_owned(),
            title: article.title().map(str::to_owned),
            views: article.views(),
            total_reading_time: article.total_reading_time_ms(),
            average_scroll_depth: article.average_scroll_depth(),
            last_viewed: article.last_viewed(),
            sessions: article
                .sessions()
                .iter()
                .map(SessionRecord::from_session)
                .collect(),
        }
    }

    fn into_article(self) -> Result<ArticleAnalytics, RecordCodecError> {
        let slug = ArticleSlug::new(self.slug).map_err(reading_core::Error::from)?;
        let mut sessions = Vec::with_capacity(self.sessions.len());
        for record in self.sessions {
            match record.into_session() {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    tracing::warn!(slug = %slug, error = %err, "skipping invalid stored session");
                }
            }
        }
        Ok(ArticleAnalytics::from_persisted(
            slug,
            self.title,
            self.views,
            self.last_viewed,
            sessions,
        ))
    }
}

/// Parse the stored JSON array into domain records.
///
/// A record that parses but fails validation is skipped with a warning so the
/// rest of the collection survives.
///
/// # Errors
///
/// Returns `RecordCodecError::Json` if the JSON is malformed or not an array
/// of records.
pub fn decode_records(raw: &str) -> Result<Vec<ArticleAnalytics>, RecordCodecError> {
    let records: Vec<ArticleRecord> = serde_json::from_str(raw)?;
    let articles = records
        .into_iter()
        .filter_map(|record| match record.into_article() {
            Ok(article) => Some(article),
            Err(err) => {
                tracing::warn!(error = %err, "skipping invalid stored article record");
                None
            }
        })
        .collect();
    Ok(articles)
}

/// Serialize domain records into the stored JSON array.
///
/// # Errors
///
/// Returns `RecordCodecError::Json` if serialization fails.
pub fn encode_records(articles: &[ArticleAnalytics]) -> Result<String, RecordCodecError> {
    let records: Vec<ArticleRecord> = articles.iter().map(ArticleRecord::from_article).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Reads and writes the full article collection under one key.
#[derive(Clone)]
pub struct ArticleRecordStore {
    items: Arc<dyn KeyValueStore>,
    key: String,
}

impl ArticleRecordStore {
    #[must_use]
    pub fn new(items: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(items, ANALYTICS_STORAGE_KEY)
    }

    #[must_use]
    pub fn with_key(items: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            items,
            key: key.into(),
        }
    }

    /// Load every record. A missing or unreadable value is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    pub async fn load(&self) -> Result<Vec<ArticleAnalytics>, StorageError> {
        let Some(raw) = self.items.get_item(&self.key).await? else {
            return Ok(Vec::new());
        };
        match decode_records(&raw) {
            Ok(articles) => Ok(articles),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "discarding unreadable analytics data");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the stored collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub async fn save(&self, articles: &[ArticleAnalytics]) -> Result<(), StorageError> {
        let raw = encode_records(articles)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.items.set_item(&self.key, &raw).await
    }

    /// Remove the stored collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend write fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.items.remove_item(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryStore, UnavailableStore};
    use reading_core::time::fixed_now;

    fn sample_article() -> ArticleAnalytics {
        let mut session = ReadingSession::new(
            SessionId::new("1700000000000-k3j9x0a1b"),
            fixed_now(),
            Device::Tablet,
            Some("https://example.com/".into()),
        );
        session.record_scroll_depth(64);
        session.set_reading_time_ms(4200);
        let mut article = ArticleAnalytics::new(ArticleSlug::new("rust-async").unwrap(), fixed_now());
        article.set_title(Some("Rust Async"));
        article.record_view(session, fixed_now());
        article
    }

    #[test]
    fn encodes_camel_case_with_derived_fields() {
        let raw = encode_records(&[sample_article()]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &json[0];
        assert_eq!(record["slug"], "rust-async");
        assert_eq!(record["views"], 1);
        assert_eq!(record["totalReadingTime"], 4200);
        assert_eq!(record["lastViewed"], "2023-11-14T22:13:20Z");
        assert_eq!(record["sessions"][0]["sessionId"], "1700000000000-k3j9x0a1b");
        assert_eq!(record["sessions"][0]["device"], "tablet");
    }

    #[test]
    fn decodes_what_it_encodes() {
        let article = sample_article();
        let raw = encode_records(std::slice::from_ref(&article)).unwrap();
        assert_eq!(decode_records(&raw).unwrap(), vec![article]);
    }

    #[test]
    fn decodes_loosely_typed_numbers() {
        let raw = r#"[{
            "slug": "hello-world",
            "views": 1,
            "totalReadingTime": 0,
            "averageScrollDepth": 0,
            "lastViewed": "2024-03-01T10:00:00.000Z",
            "sessions": [{
                "sessionId": "1709287200000-abcdefghi",
                "startTime": "2024-03-01T10:00:00.000Z",
                "scrollDepth": 140.4,
                "readingTime": 1234.6,
                "device": "mobile",
                "referrer": ""
            }]
        }]"#;
        let articles = decode_records(raw).unwrap();
        let session = &articles[0].sessions()[0];
        assert_eq!(session.scroll_depth(), 100);
        assert_eq!(session.reading_time_ms(), 1235);
        assert_eq!(session.referrer(), None);
    }

    #[test]
    fn rejects_non_array_shape() {
        assert!(matches!(
            decode_records(r#"{"slug":"x"}"#),
            Err(RecordCodecError::Json(_))
        ));
    }

    #[test]
    fn skips_blank_slug_record_and_keeps_the_rest() {
        let raw = r#"[
            {"slug":" ","views":0,"lastViewed":"2024-03-01T10:00:00Z"},
            {"slug":"kept","views":2,"lastViewed":"2024-03-01T10:00:00Z"}
        ]"#;
        let articles = decode_records(raw).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].slug().as_str(), "kept");
        assert_eq!(articles[0].views(), 2);
    }

    #[test]
    fn inverted_session_range_loses_only_its_end_time() {
        let raw = r#"[{
            "slug": "late-night",
            "views": 1,
            "lastViewed": "2024-03-01T10:00:00Z",
            "sessions": [{
                "sessionId": "1709287200000-zzzzzzzzz",
                "startTime": "2024-03-01T10:00:00Z",
                "endTime": "2024-03-01T09:00:00Z",
                "scrollDepth": 40,
                "readingTime": 900,
                "device": "desktop"
            }]
        }]"#;
        let articles = decode_records(raw).unwrap();
        let session = &articles[0].sessions()[0];
        assert_eq!(session.end_time(), None);
        assert_eq!(session.scroll_depth(), 40);
        assert_eq!(session.reading_time_ms(), 900);
    }

    #[tokio::test]
    async fn load_treats_missing_key_as_empty() {
        let store = ArticleRecordStore::new(Arc::new(InMemoryStore::new()));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_treats_malformed_value_as_empty() {
        let items = InMemoryStore::new();
        items
            .set_item(ANALYTICS_STORAGE_KEY, "{not json")
            .await
            .unwrap();
        let store = ArticleRecordStore::new(Arc::new(items));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_load_clear_cycle() {
        let store = ArticleRecordStore::new(Arc::new(InMemoryStore::new()));
        store.save(&[sample_article()]).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let store = ArticleRecordStore::new(Arc::new(UnavailableStore));
        assert!(matches!(store.load().await, Err(StorageError::Unavailable)));
    }
}
