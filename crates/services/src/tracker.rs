use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use reading_core::model::{Device, ReadingSession, ScrollSample, SessionId};

use crate::environment::{PageEnvironment, Visibility};

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `<unix millis>-<9 random base36 chars>`.
fn generate_session_id(now: DateTime<Utc>) -> SessionId {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
        .collect();
    SessionId::new(format!("{}-{suffix}", now.timestamp_millis()))
}

/// Keeps one live `ReadingSession` current for a page visit.
///
/// Built against a page that does not exist (server-side rendering) the
/// tracker is inert: every method is a no-op and `snapshot` returns `None`.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    active: Option<ActiveSession>,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    session: ReadingSession,
    /// Visible time accumulated before the most recent hide.
    accrued: Duration,
    /// Start of the current visible stretch; `None` while hidden.
    visible_since: Option<DateTime<Utc>>,
    /// Latest scroll sample still inside its debounce window.
    pending: Option<(ScrollSample, DateTime<Utc>)>,
    debounce: Duration,
}

impl ActiveSession {
    fn reading_time_at(&self, at: DateTime<Utc>) -> Duration {
        let current = self
            .visible_since
            .map_or_else(Duration::zero, |since| (at - since).max(Duration::zero()));
        self.accrued + current
    }

    fn refresh_reading_time(&mut self, at: DateTime<Utc>) {
        let ms = u64::try_from(self.reading_time_at(at).num_milliseconds()).unwrap_or(0);
        self.session.set_reading_time_ms(ms);
    }

    fn apply(&mut self, sample: ScrollSample, at: DateTime<Utc>) {
        if let Some(pct) = sample.percentage() {
            self.session.record_scroll_depth(pct);
        }
        self.refresh_reading_time(at);
    }

    fn flush_pending(&mut self, at: DateTime<Utc>) {
        if let Some((sample, _)) = self.pending.take() {
            self.apply(sample, at);
        }
    }

    fn flush_settled(&mut self, at: DateTime<Utc>) {
        if let Some((_, queued_at)) = self.pending {
            if at - queued_at >= self.debounce {
                self.flush_pending(at);
            }
        }
    }
}

impl SessionTracker {
    /// Start a session for the page described by `page`.
    ///
    /// The device class is decided here and never revisited.
    #[must_use]
    pub fn start(page: &dyn PageEnvironment, now: DateTime<Utc>, debounce: Duration) -> Self {
        let Some(width) = page.viewport_width() else {
            tracing::debug!("no page environment, session tracking disabled");
            return Self::inert();
        };

        let session = ReadingSession::new(
            generate_session_id(now),
            now,
            Device::from_viewport_width(width),
            page.referrer(),
        );
        let visible_since = match page.visibility() {
            Visibility::Visible => Some(now),
            Visibility::Hidden => None,
        };

        Self {
            active: Some(ActiveSession {
                session,
                accrued: Duration::zero(),
                visible_since,
                pending: None,
                debounce,
            }),
        }
    }

    #[must_use]
    pub fn inert() -> Self {
        Self { active: None }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Queue a scroll measurement.
    ///
    /// Samples are debounced: a sample is measured only after no newer sample
    /// arrived for the debounce window. A settled sample is measured as soon
    /// as the next event (scroll, `tick`, visibility change, `finalize` or
    /// `snapshot`) observes it.
    pub fn on_scroll(&mut self, sample: ScrollSample, at: DateTime<Utc>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.session.is_finished() {
            return;
        }
        active.flush_settled(at);
        active.pending = Some((sample, at));
    }

    /// Let time pass without new events, measuring a settled scroll sample.
    pub fn tick(&mut self, at: DateTime<Utc>) {
        if let Some(active) = self.active.as_mut() {
            active.flush_settled(at);
        }
    }

    /// Pause reading time while hidden, resume when visible again.
    pub fn on_visibility_change(&mut self, visibility: Visibility, at: DateTime<Utc>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.session.is_finished() {
            return;
        }
        active.flush_settled(at);
        match (visibility, active.visible_since) {
            (Visibility::Hidden, Some(_)) => {
                active.accrued = active.reading_time_at(at);
                active.visible_since = None;
                active.refresh_reading_time(at);
            }
            (Visibility::Visible, None) => {
                active.visible_since = Some(at);
            }
            _ => {}
        }
    }

    /// Close the in-memory session at page unload. Idempotent.
    pub fn finalize(&mut self, at: DateTime<Utc>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.session.is_finished() {
            return;
        }
        active.flush_pending(at);
        active.refresh_reading_time(at);
        active.accrued = active.reading_time_at(at);
        active.visible_since = None;
        active.session.finish(at);
    }

    /// Copy of the session with reading time brought up to `at`.
    #[must_use]
    pub fn snapshot(&mut self, at: DateTime<Utc>) -> Option<ReadingSession> {
        let active = self.active.as_mut()?;
        if !active.session.is_finished() {
            active.flush_settled(at);
            active.refresh_reading_time(at);
        }
        Some(active.session.clone())
    }

    /// The live session, as last updated.
    #[must_use]
    pub fn session(&self) -> Option<&ReadingSession> {
        self.active.as_ref().map(|a| &a.session)
    }
}
