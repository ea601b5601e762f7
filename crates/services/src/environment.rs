//! What the tracker may learn about the page it runs in.

/// Whether the page is currently shown to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Page facts read once when a session starts.
///
/// `viewport_width` returning `None` means there is no page at all (for
/// example during server-side rendering); the tracker then stays inert.
pub trait PageEnvironment: Send + Sync {
    fn viewport_width(&self) -> Option<u32>;

    fn referrer(&self) -> Option<String> {
        None
    }

    fn visibility(&self) -> Visibility {
        Visibility::Visible
    }
}

/// A page with fixed measurements.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    pub viewport_width: u32,
    pub referrer: Option<String>,
    pub visibility: Visibility,
}

impl StaticPage {
    #[must_use]
    pub fn new(viewport_width: u32) -> Self {
        Self {
            viewport_width,
            referrer: None,
            visibility: Visibility::Visible,
        }
    }

    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }
}

impl PageEnvironment for StaticPage {
    fn viewport_width(&self) -> Option<u32> {
        Some(self.viewport_width)
    }

    fn referrer(&self) -> Option<String> {
        self.referrer.clone()
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }
}

/// No page: rendering on the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerRender;

impl PageEnvironment for ServerRender {
    fn viewport_width(&self) -> Option<u32> {
        None
    }
}
