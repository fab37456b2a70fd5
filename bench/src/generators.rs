//! Synthetic category hierarchies.
//!
//! All generators are single-threaded and deterministic: the same size and
//! cost model always produce the same graph. Category ids start at 1; page
//! ids start at `PAGE_ID_BASE` so the two never collide.

use std::collections::VecDeque;

use category_distance_core::{
    CategoryGraph, CategoryGraphBuilder, CategoryId, CostModel, Language, PageId, Result,
};
use clap::ValueEnum;

pub const PAGE_ID_BASE: PageId = 10_000_000;

/// Graph shapes available to the `bench` and `generate` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// Fractal branching tree (deep, single parent)
    Tree,
    /// Preferential attachment with several parents per category (hub-heavy)
    Dag,
    /// Uniform random parent links, including a few cycles
    Random,
    /// Two trees joined by a thin chain of bridge categories
    Barbell,
    /// Organic frontier growth with occasional second parents
    Dla,
}

impl Shape {
    pub const ALL: [Shape; 5] = [Shape::Tree, Shape::Dag, Shape::Random, Shape::Barbell, Shape::Dla];

    pub fn describe(self) -> &'static str {
        match self {
            Shape::Tree => "L-system tree",
            Shape::Dag => "Scale-free DAG (edge sampling)",
            Shape::Random => "Erdos-Renyi random hierarchy",
            Shape::Barbell => "Barbell (tree-bridge-tree)",
            Shape::Dla => "DLA (organic branching)",
        }
    }

    pub fn generate(self, categories: u64, costs: CostModel, language: Language) -> Result<CategoryGraph> {
        let mut gen = Generator::new(categories, costs, language, self.seed());
        match self {
            Shape::Tree => gen.tree(),
            Shape::Dag => gen.dag(),
            Shape::Random => gen.random(),
            Shape::Barbell => gen.barbell(),
            Shape::Dla => gen.dla(),
        }
        gen.finish()
    }

    fn seed(self) -> u64 {
        match self {
            Shape::Tree => 42,
            Shape::Dag => 12345,
            Shape::Random => 54321,
            Shape::Barbell => 99999,
            Shape::Dla => 77777,
        }
    }
}

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Shared state for the generators: the builder, the RNG and page id
/// allocation.
struct Generator {
    builder: CategoryGraphBuilder,
    rng: FastRng,
    target: u64,
    next_page: PageId,
}

impl Generator {
    fn new(target: u64, costs: CostModel, language: Language, seed: u64) -> Self {
        Self {
            builder: CategoryGraphBuilder::with_capacity(language, target as usize)
                .with_cost_model(costs),
            rng: FastRng::new(seed),
            target: target.max(1),
            next_page: PAGE_ID_BASE,
        }
    }

    /// Register category `id` and file 0-4 new pages under it. Roughly one
    /// in ten categories also receives an existing page, so some pages sit in
    /// several categories.
    fn category(&mut self, id: CategoryId) {
        self.builder.add_category(id, &format!("Category {}", id));
        for _ in 0..self.rng.next(5) {
            self.builder.add_page(id, self.next_page);
            self.next_page += 1;
        }
        if self.next_page > PAGE_ID_BASE && self.rng.next(10) == 0 {
            let shared = PAGE_ID_BASE + self.rng.next(self.next_page - PAGE_ID_BASE);
            self.builder.add_page(id, shared);
        }
    }

    /// Each category spawns three subcategories, breadth first.
    fn tree(&mut self) {
        let branching = 3u64;
        self.category(1);

        let mut next_id: CategoryId = 2;
        let mut frontier: Vec<CategoryId> = vec![1];

        while next_id <= self.target && !frontier.is_empty() {
            let mut next_frontier = Vec::with_capacity(frontier.len() * branching as usize);
            for &parent in &frontier {
                for _ in 0..branching {
                    if next_id > self.target {
                        break;
                    }
                    let child = next_id;
                    next_id += 1;
                    self.category(child);
                    self.builder.add_subcategory(parent, child);
                    next_frontier.push(child);
                }
            }
            frontier = next_frontier;
        }
    }

    /// Preferential attachment: new categories pick up to three parents by
    /// sampling endpoints of existing links, so well-linked categories become
    /// hubs. Parents are always older, so the result is acyclic.
    fn dag(&mut self) {
        let parents_per_category = 3u64;
        let mut endpoints: Vec<CategoryId> =
            Vec::with_capacity((self.target * parents_per_category * 2) as usize);

        let seed = 5u64.min(self.target);
        for id in 1..=seed {
            self.category(id);
        }
        for child in 2..=seed {
            self.builder.add_subcategory(1, child);
            endpoints.push(1);
            endpoints.push(child);
        }
        if endpoints.is_empty() {
            endpoints.push(1);
        }

        for id in (seed + 1)..=self.target {
            self.category(id);
            let attach = 1 + self.rng.next(parents_per_category);
            for _ in 0..attach {
                let idx = self.rng.next(endpoints.len() as u64) as usize;
                let parent = endpoints[idx];
                self.builder.add_subcategory(parent, id);
                endpoints.push(parent);
                endpoints.push(id);
            }
        }
    }

    /// About two parent links per category, mostly to lower ids. One link in
    /// twenty points the other way, creating cycles like real category data.
    fn random(&mut self) {
        for id in 1..=self.target {
            self.category(id);
        }
        if self.target < 2 {
            return;
        }
        for child in 2..=self.target {
            for _ in 0..2 {
                let other = 1 + self.rng.next(self.target);
                if other == child {
                    continue;
                }
                if other < child || self.rng.next_f64() < 0.05 {
                    self.builder.add_subcategory(other, child);
                }
            }
        }
    }

    /// Two binary trees whose last leaves are joined through a chain of ten
    /// bridge categories, the far tree hanging below the bridge.
    fn barbell(&mut self) {
        let bridge_len = 10u64.min(self.target.saturating_sub(2));
        let side = (self.target - bridge_len) / 2;
        if side == 0 {
            self.category(1);
            return;
        }

        // Tree A: 1..=side, heap-shaped.
        for id in 1..=side {
            self.category(id);
            if id > 1 {
                self.builder.add_subcategory(id / 2, id);
            }
        }

        // Bridge: hangs below the last category of tree A.
        let bridge_start = side + 1;
        for i in 0..bridge_len {
            let id = bridge_start + i;
            self.category(id);
            let parent = if i == 0 { side } else { id - 1 };
            self.builder.add_subcategory(parent, id);
        }

        // Tree B: rooted below the end of the bridge.
        let b_start = bridge_start + bridge_len;
        for i in 0..side {
            let id = b_start + i;
            self.category(id);
            let parent = if i == 0 { b_start - 1 } else { b_start + (i + 1) / 2 - 1 };
            self.builder.add_subcategory(parent, id);
        }
    }

    /// New categories attach below a random "surface" category (recent
    /// additions), with a 10% chance of a second, arbitrary parent.
    fn dla(&mut self) {
        self.category(1);

        let surface_max = 10_000usize;
        let mut surface: VecDeque<CategoryId> = VecDeque::with_capacity(surface_max + 1);
        surface.push_back(1);

        for id in 2..=self.target {
            self.category(id);

            let parent = surface[self.rng.next(surface.len() as u64) as usize];
            self.builder.add_subcategory(parent, id);

            if self.rng.next(10) == 0 && id > 2 {
                let other = 1 + self.rng.next(id - 1);
                if other != parent {
                    self.builder.add_subcategory(other, id);
                }
            }

            surface.push_back(id);
            if surface.len() > surface_max {
                surface.pop_front();
            }
        }
    }

    fn finish(self) -> Result<CategoryGraph> {
        self.builder.build()
    }
}
