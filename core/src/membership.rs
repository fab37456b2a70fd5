use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, Error, Result};
use crate::graph::{CategoryGraph, CategoryId, PageId};

/// Language (corpus edition) a page belongs to, stored as a lowercase code
/// such as `en` or `simple`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Validate and normalize a language code.
    ///
    /// Codes are lowercased; only ASCII letters, digits and `-`/`_` are accepted.
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_lowercase();
        if code.is_empty()
            || !code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidLanguage(code));
        }
        Ok(Self(code))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Language {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

/// A category a page is directly filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub title: String,
}

/// Lookup of a page's direct category memberships.
///
/// Implemented by storage layers outside this crate. `Ok(None)` means the page
/// is unknown; an `Err` is a lookup failure and aborts search construction.
/// The map is ordered so that searches seed their open set deterministically.
pub trait CategoryMembership {
    fn direct_categories(
        &self,
        language: &Language,
        page: PageId,
    ) -> std::result::Result<Option<BTreeMap<CategoryId, CategoryRecord>>, BoxError>;
}

impl<T: CategoryMembership + ?Sized> CategoryMembership for &T {
    fn direct_categories(
        &self,
        language: &Language,
        page: PageId,
    ) -> std::result::Result<Option<BTreeMap<CategoryId, CategoryRecord>>, BoxError> {
        (**self).direct_categories(language, page)
    }
}

/// In-memory membership table keyed by (language, page).
#[derive(Debug, Default)]
pub struct MembershipIndex {
    memberships: HashMap<(Language, PageId), BTreeMap<CategoryId, CategoryRecord>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert a graph's page lists: every page attached to a category becomes
    /// a member of it, under the graph's language.
    pub fn from_graph(graph: &CategoryGraph) -> Self {
        let mut index = Self::new();
        for ci in graph.indices() {
            let record = CategoryRecord {
                id: graph.category_id(ci),
                title: graph.title(ci).to_string(),
            };
            for &page in graph.pages(ci) {
                index.insert(graph.language().clone(), page, record.clone());
            }
        }
        index
    }

    /// Record that `page` is directly filed under `category`.
    pub fn insert(&mut self, language: Language, page: PageId, category: CategoryRecord) {
        self.memberships
            .entry((language, page))
            .or_default()
            .insert(category.id, category);
    }

    /// Number of (language, page) entries.
    pub fn page_count(&self) -> usize {
        self.memberships.len()
    }
}

impl CategoryMembership for MembershipIndex {
    fn direct_categories(
        &self,
        language: &Language,
        page: PageId,
    ) -> std::result::Result<Option<BTreeMap<CategoryId, CategoryRecord>>, BoxError> {
        // Key is owned, so probing allocates one clone of the language code.
        Ok(self.memberships.get(&(language.clone(), page)).cloned())
    }
}
