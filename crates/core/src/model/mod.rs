mod article;
mod device;
mod ids;
mod session;

pub use ids::{ArticleSlug, SessionId, SlugError};

pub use article::ArticleAnalytics;
pub use device::{DESKTOP_MIN_WIDTH, Device, TABLET_MIN_WIDTH};
pub use session::{ReadingSession, ReadingSessionError, ScrollSample};
