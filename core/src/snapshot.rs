//! Serializable form of a [`CategoryGraph`].
//!
//! A snapshot lists each category once with its parents and directly attached
//! pages. Children are implied by the parent lists. Costs are optional; when
//! absent the builder's cost model applies.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{CategoryGraph, CategoryGraphBuilder, CategoryId, CostModel, PageId};
use crate::membership::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub id: CategoryId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub parents: Vec<CategoryId>,
    #[serde(default)]
    pub pages: Vec<PageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub language: Language,
    #[serde(default)]
    pub cost_model: CostModel,
    pub categories: Vec<CategorySnapshot>,
}

impl CategoryGraph {
    /// Build a graph from a snapshot. Parents that are not listed as
    /// categories themselves are created with empty titles.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<CategoryGraph> {
        let mut b = CategoryGraphBuilder::with_capacity(
            snapshot.language.clone(),
            snapshot.categories.len(),
        )
        .with_cost_model(snapshot.cost_model);

        // Register all listed categories first so their indices follow
        // snapshot order.
        for cat in &snapshot.categories {
            b.add_category(cat.id, &cat.title);
        }
        for cat in &snapshot.categories {
            if let Some(cost) = cat.cost {
                b.set_cost(cat.id, cost);
            }
            for &parent in &cat.parents {
                b.add_subcategory(parent, cat.id);
            }
            for &page in &cat.pages {
                b.add_page(cat.id, page);
            }
        }

        b.build()
    }

    /// Export the graph with every cost made explicit.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let categories = self
            .indices()
            .map(|ci| CategorySnapshot {
                id: self.category_id(ci),
                title: self.title(ci).to_string(),
                cost: Some(self.cost(ci)),
                parents: self
                    .parents(ci)
                    .iter()
                    .map(|&p| self.category_id(p))
                    .collect(),
                pages: self.pages(ci).to_vec(),
            })
            .collect();

        GraphSnapshot {
            language: self.language().clone(),
            cost_model: CostModel::default(),
            categories,
        }
    }
}
