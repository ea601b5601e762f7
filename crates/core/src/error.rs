use thiserror::Error;

use crate::model::{ReadingSessionError, SlugError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Session(#[from] ReadingSessionError),
}
