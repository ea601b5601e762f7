use reading_core::model::{ArticleAnalytics, ReadingSession};
use serde_json::{Value, json};

fn session_json(session: &ReadingSession) -> Value {
    json!({
        "sessionId": session.session_id().as_str(),
        "startTime": session.start_time().to_rfc3339(),
        "endTime": session.end_time().map(|t| t.to_rfc3339()),
        "scrollDepth": session.scroll_depth(),
        "readingTime": session.reading_time_ms(),
        "device": session.device().as_str(),
        "referrer": session.referrer(),
    })
}

/// Detail view of one article, derived fields included.
pub fn article_json(article: &ArticleAnalytics) -> Value {
    json!({
        "slug": article.slug().as_str(),
        "title": article.display_title(),
        "views": article.views(),
        "lastViewed": article.last_viewed().to_rfc3339(),
        "totalReadingTime": article.total_reading_time_ms(),
        "averageReadingTime": article.average_reading_time_ms(),
        "averageScrollDepth": article.average_scroll_depth(),
        "sessions": article.sessions().iter().map(session_json).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reading_core::model::{ArticleSlug, Device, SessionId};
    use reading_core::time::fixed_now;

    #[test]
    fn includes_derived_fields() {
        let mut session =
            ReadingSession::new(SessionId::new("s1"), fixed_now(), Device::Mobile, None);
        session.set_reading_time_ms(1500);
        session.record_scroll_depth(30);
        let mut article = ArticleAnalytics::new(ArticleSlug::new("my-post").unwrap(), fixed_now());
        article.record_view(session, fixed_now());

        let value = article_json(&article);
        assert_eq!(value["title"], "My Post");
        assert_eq!(value["totalReadingTime"], 1500);
        assert_eq!(value["averageScrollDepth"], 30.0);
        assert_eq!(value["sessions"][0]["device"], "mobile");
        assert!(value["sessions"][0]["endTime"].is_null());
    }
}
