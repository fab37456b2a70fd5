//! Error types for category-distance operations.
//!
//! A single `Error` enum and `Result<T>` alias are shared by every module.
//! `step()` itself never fails; errors come from construction (lookup and
//! configuration) and from reading distances that were never finalized.

use thiserror::Error;

use crate::graph::{CategoryId, PageId};
use crate::membership::Language;

/// Boxed error returned by external collaborators such as membership lookups.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building graphs or running searches.
#[derive(Error, Debug)]
pub enum Error {
    /// The category-membership lookup for the start page failed.
    #[error("category lookup failed for page {page} ({language}): {source}")]
    Lookup {
        language: Language,
        page: PageId,
        #[source]
        source: BoxError,
    },

    /// The category id has no index in the graph.
    #[error("category {0} is not in the graph")]
    UnknownCategory(CategoryId),

    /// The category exists but no distance has been finalized for it.
    #[error("no finalized distance for category {0}")]
    CategoryDistanceUnavailable(CategoryId),

    /// No distance has been finalized for the page.
    #[error("no finalized distance for page {0}")]
    PageDistanceUnavailable(PageId),

    /// Invalid search configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A category cost that is negative or not finite.
    #[error("invalid cost {cost} for category {category}")]
    InvalidCost { category: CategoryId, cost: f64 },

    /// A language code that is empty or contains unexpected characters.
    #[error("invalid language code: '{0}'")]
    InvalidLanguage(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for errors caused by asking about something that was never
    /// finalized or never existed, as opposed to collaborator failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownCategory(_)
                | Self::CategoryDistanceUnavailable(_)
                | Self::PageDistanceUnavailable(_)
        )
    }
}

/// Result type alias using this crate's `Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::UnknownCategory(7).is_not_found());
        assert!(Error::PageDistanceUnavailable(7).is_not_found());
        assert!(Error::CategoryDistanceUnavailable(7).is_not_found());
        assert!(!Error::config("max_results must be at least 1").is_not_found());
    }

    #[test]
    fn test_lookup_error_display() {
        let err = Error::Lookup {
            language: Language::new("en").unwrap(),
            page: 42,
            source: "connection reset".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("page 42"));
        assert!(msg.contains("en"));
        assert!(msg.contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
