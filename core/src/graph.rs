use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::membership::Language;

/// External, stable category identifier (page id of the category page).
pub type CategoryId = u64;

/// External page identifier.
pub type PageId = u64;

/// Dense internal index into the graph's parallel arrays.
pub type CategoryIndex = u32;

/// How the builder assigns costs to categories without an explicit one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "model", content = "value")]
pub enum CostModel {
    /// Every category costs the same to enter.
    Uniform(f64),
    /// Broad categories cost more: `ln(1 + pages) / ln(1 + max_pages)`.
    PageCount,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::Uniform(1.0)
    }
}

/// Immutable category hierarchy stored as parallel arrays.
///
/// Category identity is a dense `CategoryIndex`; parent and child lists hold
/// indices rather than references, so cycles in the hierarchy are harmless.
/// The cost of a category is paid when a search *enters* it.
#[derive(Debug)]
pub struct CategoryGraph {
    language: Language,
    ids: Vec<CategoryId>,
    titles: Vec<String>,
    costs: Vec<f64>,
    parents: Vec<Vec<CategoryIndex>>,
    children: Vec<Vec<CategoryIndex>>,
    pages: Vec<Vec<PageId>>,
    index: HashMap<CategoryId, CategoryIndex>,
}

impl CategoryGraph {
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Internal index for an external category id.
    pub fn index_of(&self, id: CategoryId) -> Option<CategoryIndex> {
        self.index.get(&id).copied()
    }

    pub fn category_id(&self, ci: CategoryIndex) -> CategoryId {
        self.ids[ci as usize]
    }

    pub fn title(&self, ci: CategoryIndex) -> &str {
        &self.titles[ci as usize]
    }

    /// Cost of entering category `ci`.
    pub fn cost(&self, ci: CategoryIndex) -> f64 {
        self.costs[ci as usize]
    }

    pub fn parents(&self, ci: CategoryIndex) -> &[CategoryIndex] {
        &self.parents[ci as usize]
    }

    pub fn children(&self, ci: CategoryIndex) -> &[CategoryIndex] {
        &self.children[ci as usize]
    }

    /// Pages filed directly under category `ci`.
    pub fn pages(&self, ci: CategoryIndex) -> &[PageId] {
        &self.pages[ci as usize]
    }

    /// All valid category indices, in index order.
    pub fn indices(&self) -> impl Iterator<Item = CategoryIndex> {
        0..self.ids.len() as CategoryIndex
    }

    pub fn category_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of parent→child links.
    pub fn edge_count(&self) -> usize {
        self.children.iter().map(|c| c.len()).sum()
    }

    /// Number of (category, page) attachments.
    pub fn page_link_count(&self) -> usize {
        self.pages.iter().map(|p| p.len()).sum()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let per_category = size_of::<CategoryId>()
            + size_of::<String>()
            + size_of::<f64>()
            + 3 * size_of::<Vec<u8>>();
        let titles: usize = self.titles.iter().map(|t| t.capacity()).sum();
        let links = 2 * self.edge_count() * size_of::<CategoryIndex>();
        let pages = self.page_link_count() * size_of::<PageId>();
        let index_mem = self.index.len() * 24;

        self.ids.len() * per_category + titles + links + pages + index_mem
    }
}

/// Mutable assembly area for a [`CategoryGraph`].
///
/// Categories are created on first mention, so edges and page attachments may
/// be added in any order. Duplicate links are kept; searches tolerate them.
#[derive(Debug)]
pub struct CategoryGraphBuilder {
    language: Language,
    cost_model: CostModel,
    ids: Vec<CategoryId>,
    titles: Vec<String>,
    explicit_costs: Vec<Option<f64>>,
    parents: Vec<Vec<CategoryIndex>>,
    children: Vec<Vec<CategoryIndex>>,
    pages: Vec<Vec<PageId>>,
    index: HashMap<CategoryId, CategoryIndex>,
}

impl CategoryGraphBuilder {
    pub fn new(language: Language) -> Self {
        Self::with_capacity(language, 0)
    }

    /// Pre-allocate for a known category count.
    pub fn with_capacity(language: Language, categories: usize) -> Self {
        Self {
            language,
            cost_model: CostModel::default(),
            ids: Vec::with_capacity(categories),
            titles: Vec::with_capacity(categories),
            explicit_costs: Vec::with_capacity(categories),
            parents: Vec::with_capacity(categories),
            children: Vec::with_capacity(categories),
            pages: Vec::with_capacity(categories),
            index: HashMap::with_capacity(categories),
        }
    }

    pub fn with_cost_model(mut self, model: CostModel) -> Self {
        self.cost_model = model;
        self
    }

    /// Register a category, returning its index. Re-adding an existing id
    /// keeps the index and replaces an empty title.
    pub fn add_category(&mut self, id: CategoryId, title: &str) -> CategoryIndex {
        let ci = self.ensure(id);
        let slot = &mut self.titles[ci as usize];
        if slot.is_empty() {
            *slot = title.to_string();
        }
        ci
    }

    /// Link `child` under `parent`, creating either category if needed.
    pub fn add_subcategory(&mut self, parent: CategoryId, child: CategoryId) {
        let p = self.ensure(parent);
        let c = self.ensure(child);
        self.children[p as usize].push(c);
        self.parents[c as usize].push(p);
    }

    /// File `page` directly under `category`.
    pub fn add_page(&mut self, category: CategoryId, page: PageId) {
        let ci = self.ensure(category);
        self.pages[ci as usize].push(page);
    }

    /// Override the cost model for one category. Validated in [`build`](Self::build).
    pub fn set_cost(&mut self, category: CategoryId, cost: f64) {
        let ci = self.ensure(category);
        self.explicit_costs[ci as usize] = Some(cost);
    }

    pub fn category_count(&self) -> usize {
        self.ids.len()
    }

    fn ensure(&mut self, id: CategoryId) -> CategoryIndex {
        if let Some(&ci) = self.index.get(&id) {
            return ci;
        }
        let ci = CategoryIndex::try_from(self.ids.len())
            .unwrap_or_else(|_| panic!("category graph exceeded maximum of {} categories", CategoryIndex::MAX));
        self.ids.push(id);
        self.titles.push(String::new());
        self.explicit_costs.push(None);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        self.pages.push(Vec::new());
        self.index.insert(id, ci);
        ci
    }

    /// Freeze the graph, resolving costs from the cost model.
    ///
    /// Fails with [`Error::InvalidCost`] if any resolved cost is negative or
    /// not finite.
    pub fn build(self) -> Result<CategoryGraph> {
        let max_pages = self.pages.iter().map(|p| p.len()).max().unwrap_or(0);
        let mut costs = Vec::with_capacity(self.ids.len());

        for (i, explicit) in self.explicit_costs.iter().enumerate() {
            let cost = match (*explicit, self.cost_model) {
                (Some(c), _) => c,
                (None, CostModel::Uniform(c)) => c,
                (None, CostModel::PageCount) => page_count_cost(self.pages[i].len(), max_pages),
            };
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::InvalidCost {
                    category: self.ids[i],
                    cost,
                });
            }
            costs.push(cost);
        }

        tracing::debug!(
            language = %self.language,
            categories = self.ids.len(),
            "built category graph"
        );

        Ok(CategoryGraph {
            language: self.language,
            ids: self.ids,
            titles: self.titles,
            costs,
            parents: self.parents,
            children: self.children,
            pages: self.pages,
            index: self.index,
        })
    }
}

fn page_count_cost(pages: usize, max_pages: usize) -> f64 {
    if max_pages == 0 {
        return 1.0;
    }
    (1.0 + pages as f64).ln() / (1.0 + max_pages as f64).ln()
}
