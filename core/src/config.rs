//! Search configuration.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::PageId;

/// Options for a single [`CategorySearch`](crate::CategorySearch).
///
/// The allow-list is reference counted so one set can be shared by every
/// search in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Stop once this many distinct pages (start page included) have
    /// finalized distances. Must be at least 1.
    pub max_results: usize,

    /// Record distances to pages attached to visited categories.
    #[serde(default = "default_true")]
    pub track_pages: bool,

    /// Allow paths that climb to an ancestor and then descend into its
    /// subcategories. When false the search only moves upward.
    #[serde(default = "default_true")]
    pub explore_descendants: bool,

    /// Only these pages may be recorded. `None` allows every page.
    #[serde(default)]
    pub allowed_pages: Option<Arc<HashSet<PageId>>>,
}

fn default_true() -> bool {
    true
}

impl SearchConfig {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            track_pages: true,
            explore_descendants: true,
            allowed_pages: None,
        }
    }

    /// Builder: enable/disable page tracking.
    pub fn with_track_pages(mut self, enabled: bool) -> Self {
        self.track_pages = enabled;
        self
    }

    /// Builder: enable/disable descending below common ancestors.
    pub fn with_explore_descendants(mut self, enabled: bool) -> Self {
        self.explore_descendants = enabled;
        self
    }

    /// Builder: restrict recorded pages to `pages`.
    pub fn with_allowed_pages(mut self, pages: Arc<HashSet<PageId>>) -> Self {
        self.allowed_pages = Some(pages);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results < 1 {
            return Err(Error::config("max_results must be at least 1"));
        }
        Ok(())
    }

    /// Whether `page` may be recorded under this configuration.
    pub fn allows(&self, page: PageId) -> bool {
        self.allowed_pages
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&page))
    }
}
