use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier for a single page visit.
///
/// Generated as `<unix millis>-<random suffix>`; uniqueness is best-effort.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SlugError {
    #[error("article slug is empty")]
    Empty,
}

/// Validated article slug (trimmed, non-empty). Key of the per-article record.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleSlug(String);

impl ArticleSlug {
    /// Create a validated slug.
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` if the slug is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fallback display title: hyphens become spaces, each word capitalized.
    ///
    /// `"intro-to-rust"` becomes `"Intro To Rust"`.
    #[must_use]
    pub fn title_case(&self) -> String {
        self.0
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<String> for ArticleSlug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArticleSlug> for String {
    fn from(slug: ArticleSlug) -> Self {
        slug.0
    }
}

impl fmt::Debug for ArticleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArticleSlug({})", self.0)
    }
}

impl fmt::Display for ArticleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_trimmed() {
        let slug = ArticleSlug::new("  rust-ownership ").unwrap();
        assert_eq!(slug.as_str(), "rust-ownership");
    }

    #[test]
    fn empty_slug_is_rejected() {
        assert_eq!(ArticleSlug::new("   "), Err(SlugError::Empty));
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        let slug = ArticleSlug::new("building-a-blog-with-next").unwrap();
        assert_eq!(slug.title_case(), "Building A Blog With Next");
    }

    #[test]
    fn title_case_keeps_empty_segments() {
        let slug = ArticleSlug::new("double--dash").unwrap();
        assert_eq!(slug.title_case(), "Double  Dash");
    }

    #[test]
    fn session_id_display() {
        let id = SessionId::new("1700000000000-abc123xyz");
        assert_eq!(id.to_string(), "1700000000000-abc123xyz");
    }
}
