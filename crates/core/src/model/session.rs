use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Device, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReadingSessionError {
    #[error("end_time is before start_time")]
    InvalidTimeRange,
}

/// One scroll measurement of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub scroll_top: f64,
    pub document_height: f64,
    pub viewport_height: f64,
}

impl ScrollSample {
    #[must_use]
    pub fn new(scroll_top: f64, document_height: f64, viewport_height: f64) -> Self {
        Self {
            scroll_top,
            document_height,
            viewport_height,
        }
    }

    /// Scroll position as a whole percentage of the scrollable height, in `[0, 100]`.
    ///
    /// A page that fits in the viewport counts as fully read. Returns `None`
    /// when any measurement is not finite.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percentage(&self) -> Option<u8> {
        if !(self.scroll_top.is_finite()
            && self.document_height.is_finite()
            && self.viewport_height.is_finite())
        {
            return None;
        }
        let scrollable = self.document_height - self.viewport_height;
        if scrollable <= 0.0 {
            return Some(100);
        }
        let pct = (self.scroll_top / scrollable * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// A single visit to an article page.
///
/// `scroll_depth` only ever grows; `reading_time_ms` is set by the tracker
/// from its own visible-time accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingSession {
    session_id: SessionId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    scroll_depth: u8,
    reading_time_ms: u64,
    device: Device,
    referrer: Option<String>,
}

impl ReadingSession {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        start_time: DateTime<Utc>,
        device: Device,
        referrer: Option<String>,
    ) -> Self {
        Self {
            session_id,
            start_time,
            end_time: None,
            scroll_depth: 0,
            reading_time_ms: 0,
            device,
            referrer: referrer.filter(|r| !r.trim().is_empty()),
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// Scroll depth above 100 is clamped.
    ///
    /// # Errors
    ///
    /// Returns `ReadingSessionError::InvalidTimeRange` if `end_time` precedes `start_time`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        scroll_depth: u8,
        reading_time_ms: u64,
        device: Device,
        referrer: Option<String>,
    ) -> Result<Self, ReadingSessionError> {
        if end_time.is_some_and(|end| end < start_time) {
            return Err(ReadingSessionError::InvalidTimeRange);
        }
        Ok(Self {
            session_id,
            start_time,
            end_time,
            scroll_depth: scroll_depth.min(100),
            reading_time_ms,
            device,
            referrer: referrer.filter(|r| !r.trim().is_empty()),
        })
    }

    /// Fold a new scroll percentage into the running maximum.
    pub fn record_scroll_depth(&mut self, percentage: u8) {
        self.scroll_depth = self.scroll_depth.max(percentage.min(100));
    }

    pub fn set_reading_time_ms(&mut self, reading_time_ms: u64) {
        self.reading_time_ms = reading_time_ms;
    }

    /// Close the session. Later calls keep the first end time.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        if self.end_time.is_none() {
            self.end_time = Some(at.max(self.start_time));
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    #[must_use]
    pub fn scroll_depth(&self) -> u8 {
        self.scroll_depth
    }

    #[must_use]
    pub fn reading_time_ms(&self) -> u64 {
        self.reading_time_ms
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    #[must_use]
    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}
