use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::graph::{CategoryGraph, CategoryId, CategoryIndex, PageId};
use crate::membership::{CategoryMembership, Language};

/// Traversal phase of an open-set entry.
///
/// A search starts `Up` and may switch to `Down`; an entry reached by moving
/// down never expands its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Open-set element. `seq` is the insertion order and breaks distance ties,
/// so equidistant entries pop first-in first-out.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    index: CategoryIndex,
    distance: f64,
    direction: Direction,
    seq: u64,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for BinaryHeap: smaller distance, then smaller seq, wins.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

/// Distances finalized by a single [`CategorySearch::step`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitedDelta {
    pub pages: HashMap<PageId, f64>,
    pub categories: HashMap<CategoryId, f64>,
}

impl VisitedDelta {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.categories.is_empty()
    }

    pub fn max_page_distance(&self) -> Option<f64> {
        self.pages.values().copied().reduce(f64::max)
    }

    pub fn max_category_distance(&self) -> Option<f64> {
        self.categories.values().copied().reduce(f64::max)
    }

    /// Fold `other` into `self`, keeping the smaller distance on overlap.
    pub fn merge(&mut self, other: VisitedDelta) {
        for (page, d) in other.pages {
            let slot = self.pages.entry(page).or_insert(d);
            *slot = slot.min(d);
        }
        for (cat, d) in other.categories {
            let slot = self.categories.entry(cat).or_insert(d);
            *slot = slot.min(d);
        }
    }
}

/// Resumable Dijkstra search over a category hierarchy from one start page.
///
/// Paths climb from the start page's categories through zero or more
/// ancestors and, when `explore_descendants` is set, may then descend
/// through subcategories. Each [`step`](Self::step) finalizes one category.
/// The search ends when the open set is empty or `max_results` pages have
/// distances.
///
/// The open set uses lazy deletion: categories may be queued several times
/// and stale entries are dropped as they reach the top.
pub struct CategorySearch<'g> {
    graph: &'g CategoryGraph,
    config: SearchConfig,
    language: Language,
    start_page: PageId,
    category_distances: HashMap<CategoryIndex, f64>,
    /// Categories whose parents have been queued.
    ascended: HashSet<CategoryIndex>,
    page_distances: HashMap<PageId, f64>,
    open: BinaryHeap<OpenEntry>,
    next_seq: u64,
    steps: usize,
}

impl<'g> CategorySearch<'g> {
    /// Seed a search from the direct categories of `start_page`.
    ///
    /// Fails if the configuration is invalid or the membership lookup fails.
    /// Membership categories missing from the graph are ignored; a page with
    /// no known categories yields a search that is already exhausted.
    pub fn new<M>(
        graph: &'g CategoryGraph,
        membership: &M,
        start_page: PageId,
        language: Language,
        config: SearchConfig,
    ) -> Result<Self>
    where
        M: CategoryMembership + ?Sized,
    {
        config.validate()?;

        if &language != graph.language() {
            warn!(
                query = %language,
                graph = %graph.language(),
                "search language differs from graph language"
            );
        }

        let memberships = membership
            .direct_categories(&language, start_page)
            .map_err(|source| Error::Lookup {
                language: language.clone(),
                page: start_page,
                source,
            })?;

        let mut search = Self {
            graph,
            config,
            language,
            start_page,
            category_distances: HashMap::new(),
            ascended: HashSet::new(),
            page_distances: HashMap::new(),
            open: BinaryHeap::new(),
            next_seq: 0,
            steps: 0,
        };
        search.page_distances.insert(start_page, 0.0);

        let mut unknown = 0usize;
        for &category in memberships.iter().flat_map(|m| m.keys()) {
            match graph.index_of(category) {
                Some(ci) => search.push(ci, graph.cost(ci), Direction::Up),
                None => unknown += 1,
            }
        }

        debug!(
            page = start_page,
            language = %search.language,
            seeded = search.open.len(),
            unknown,
            "category search seeded"
        );

        Ok(search)
    }

    fn push(&mut self, index: CategoryIndex, distance: f64, direction: Direction) {
        self.open.push(OpenEntry {
            index,
            distance,
            direction,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// True while the open set is non-empty and fewer than `max_results`
    /// pages have distances.
    pub fn has_more_results(&self) -> bool {
        !self.open.is_empty() && self.page_distances.len() < self.config.max_results
    }

    /// Finalize the closest unvisited category and expand it.
    ///
    /// Returns only what was finalized by this call. Once the search is
    /// exhausted every call returns an empty delta without changing state.
    pub fn step(&mut self) -> VisitedDelta {
        let mut delta = VisitedDelta::default();
        if !self.has_more_results() {
            return delta;
        }

        let Some(entry) = self.select() else {
            trace!(page = self.start_page, "open set drained");
            return delta;
        };

        let graph = self.graph;
        let ci = entry.index;
        let distance = entry.distance;

        self.category_distances.insert(ci, distance);
        delta.categories.insert(graph.category_id(ci), distance);
        self.steps += 1;

        trace!(
            category = graph.category_id(ci),
            distance,
            direction = ?entry.direction,
            "finalized category"
        );

        if self.config.track_pages {
            self.expand_pages(ci, distance, &mut delta);
        }

        if self.config.explore_descendants {
            for &child in graph.children(ci) {
                if !self.category_distances.contains_key(&child) {
                    self.push(child, distance + graph.cost(child), Direction::Down);
                }
            }
        }

        if entry.direction == Direction::Up {
            self.ascend(ci, distance);
        }

        self.settle();
        delta
    }

    fn select(&mut self) -> Option<OpenEntry> {
        self.settle();
        self.open.pop()
    }

    /// Discard stale entries from the top of the open set, so a non-empty
    /// open set always means another category can be finalized.
    fn settle(&mut self) {
        while let Some(top) = self.open.peek() {
            if !self.category_distances.contains_key(&top.index) {
                return;
            }
            let Some(entry) = self.open.pop() else { return };
            // Finalized on the way down; an upward route still owns its parents.
            if entry.direction == Direction::Up && !self.ascended.contains(&entry.index) {
                self.ascend(entry.index, entry.distance);
            }
        }
    }

    fn ascend(&mut self, ci: CategoryIndex, distance: f64) {
        let graph = self.graph;
        self.ascended.insert(ci);
        for &parent in graph.parents(ci) {
            if !self.ascended.contains(&parent) {
                self.push(parent, distance + graph.cost(parent), Direction::Up);
            }
        }
    }

    fn expand_pages(&mut self, ci: CategoryIndex, distance: f64, delta: &mut VisitedDelta) {
        let graph = self.graph;
        for &page in graph.pages(ci) {
            if !self.config.allows(page) {
                continue;
            }
            let improves = self
                .page_distances
                .get(&page)
                .map_or(true, |&known| known > distance);
            if improves {
                self.page_distances.insert(page, distance);
                delta.pages.insert(page, distance);
            }
            // Large categories may be cut off part way through.
            if self.page_distances.len() >= self.config.max_results {
                break;
            }
        }
    }

    /// Step until exhausted or `max_steps` steps have run, returning the
    /// merged deltas.
    pub fn run(&mut self, max_steps: Option<usize>) -> VisitedDelta {
        let mut total = VisitedDelta::default();
        let mut taken = 0usize;
        while self.has_more_results() && max_steps.map_or(true, |max| taken < max) {
            total.merge(self.step());
            taken += 1;
        }
        total
    }

    pub fn has_page_distance(&self, page: PageId) -> bool {
        self.page_distances.contains_key(&page)
    }

    pub fn distance_to_page(&self, page: PageId) -> Result<f64> {
        self.page_distances
            .get(&page)
            .copied()
            .ok_or(Error::PageDistanceUnavailable(page))
    }

    pub fn has_category_distance(&self, category: CategoryId) -> bool {
        self.graph
            .index_of(category)
            .is_some_and(|ci| self.category_distances.contains_key(&ci))
    }

    /// Finalized distance to a category. Distinguishes ids missing from the
    /// graph from categories not reached (yet).
    pub fn distance_to_category(&self, category: CategoryId) -> Result<f64> {
        let ci = self
            .graph
            .index_of(category)
            .ok_or(Error::UnknownCategory(category))?;
        self.category_distances
            .get(&ci)
            .copied()
            .ok_or(Error::CategoryDistanceUnavailable(category))
    }

    /// All finalized page distances, start page included.
    pub fn page_distances(&self) -> &HashMap<PageId, f64> {
        &self.page_distances
    }

    /// All finalized category distances keyed by category id.
    pub fn category_distances(&self) -> impl Iterator<Item = (CategoryId, f64)> + '_ {
        self.category_distances
            .iter()
            .map(|(&ci, &d)| (self.graph.category_id(ci), d))
    }

    pub fn start_page(&self) -> PageId {
        self.start_page
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of categories finalized so far.
    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    /// Entries in the open set, stale ones included.
    pub fn open_len(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::error::BoxError;
    use crate::graph::CategoryGraphBuilder;
    use crate::membership::{CategoryRecord, MembershipIndex};

    const START: PageId = 1_000;

    fn en() -> Language {
        Language::new("en").unwrap()
    }

    fn member_of(page: PageId, categories: &[CategoryId]) -> MembershipIndex {
        let mut index = MembershipIndex::new();
        for &id in categories {
            index.insert(en(), page, CategoryRecord { id, title: String::new() });
        }
        index
    }

    fn search<'g>(
        g: &'g CategoryGraph,
        membership: &MembershipIndex,
        config: SearchConfig,
    ) -> CategorySearch<'g> {
        CategorySearch::new(g, membership, START, en(), config).unwrap()
    }

    struct FailingLookup;

    impl CategoryMembership for FailingLookup {
        fn direct_categories(
            &self,
            _language: &Language,
            _page: PageId,
        ) -> std::result::Result<Option<BTreeMap<CategoryId, CategoryRecord>>, BoxError> {
            Err("database unavailable".into())
        }
    }

    /// One category (id 1, cost 2) holding the start page and pages 101..=103.
    fn make_star() -> CategoryGraph {
        let mut b = CategoryGraphBuilder::new(en());
        b.set_cost(1, 2.0);
        b.add_page(1, START);
        for p in 101..=103 {
            b.add_page(1, p);
        }
        b.build().unwrap()
    }

    /// R(1) ⊃ B(2) ⊃ A(3) ⊃ C(4); B(2) ⊃ D(5); pages on every category.
    fn make_family() -> CategoryGraph {
        let mut b = CategoryGraphBuilder::new(en());
        b.add_subcategory(1, 2);
        b.add_subcategory(2, 3);
        b.add_subcategory(3, 4);
        b.add_subcategory(2, 5);
        b.add_page(3, START);
        b.add_page(1, 10);
        b.add_page(2, 20);
        b.add_page(3, 30);
        b.add_page(4, 40);
        b.add_page(5, 50);
        b.build().unwrap()
    }

    // --- Scenarios ---

    #[test]
    fn test_star_first_step_emits_pages() {
        let g = make_star();
        let m = member_of(START, &[1]);
        let mut s = search(&g, &m, SearchConfig::new(4));

        assert!(s.has_more_results());
        let delta = s.step();
        assert_eq!(delta.categories.len(), 1);
        assert_eq!(delta.categories[&1], 2.0);
        assert_eq!(delta.pages.len(), 3);
        assert!(delta.pages.values().all(|&d| d == 2.0));

        // Start page keeps its zero distance and counts toward the cap.
        assert_eq!(s.distance_to_page(START).unwrap(), 0.0);
        assert_eq!(s.page_distances().len(), 4);
        assert!(!s.has_more_results());
    }

    #[test]
    fn test_upward_only_skips_descendants() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let config = SearchConfig::new(usize::MAX).with_explore_descendants(false);
        let mut s = search(&g, &m, config);
        s.run(None);

        assert_eq!(s.distance_to_category(3).unwrap(), 1.0);
        assert_eq!(s.distance_to_category(2).unwrap(), 2.0);
        assert_eq!(s.distance_to_category(1).unwrap(), 3.0);
        assert!(!s.has_category_distance(4));
        assert!(!s.has_category_distance(5));
        assert!(!s.has_page_distance(40));
        assert!(!s.has_page_distance(50));
        assert_eq!(s.steps_taken(), 3);
    }

    #[test]
    fn test_allow_list_excludes_page() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let allowed: Arc<HashSet<PageId>> = Arc::new([10, 20, 30, 40].into_iter().collect());
        let config = SearchConfig::new(usize::MAX).with_allowed_pages(allowed);
        let mut s = search(&g, &m, config);

        while s.has_more_results() {
            let delta = s.step();
            assert!(!delta.pages.contains_key(&50));
        }
        assert!(s.has_category_distance(5));
        assert!(!s.has_page_distance(50));
        assert!(s.has_page_distance(40));
    }

    #[test]
    fn test_single_result_exhausted_at_start() {
        let mut b = CategoryGraphBuilder::new(en());
        b.add_page(1, START);
        for p in 1..=4 {
            b.add_page(1, p);
        }
        let g = b.build().unwrap();
        let m = member_of(START, &[1]);
        let mut s = search(&g, &m, SearchConfig::new(1));

        assert!(!s.has_more_results());
        assert!(s.step().is_empty());
        assert_eq!(s.page_distances().len(), 1);
        assert!((1..=4).all(|p| !s.has_page_distance(p)));
    }

    #[test]
    fn test_page_cap_stops_mid_category() {
        let g = make_star();
        let m = member_of(START, &[1]);
        let mut s = search(&g, &m, SearchConfig::new(3));

        let delta = s.step();
        // Page list is [START, 101, 102, 103]; the cap is hit after 102.
        assert_eq!(delta.pages.len(), 2);
        assert!(delta.pages.contains_key(&101));
        assert!(delta.pages.contains_key(&102));
        assert!(!s.has_page_distance(103));
        assert!(!s.has_more_results());
    }

    // --- Traversal shape ---

    #[test]
    fn test_up_then_down() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        // A=1, B=2, D via B=3, C via A=2, R=3
        assert_eq!(s.distance_to_category(4).unwrap(), 2.0);
        assert_eq!(s.distance_to_category(5).unwrap(), 3.0);
        assert_eq!(s.distance_to_page(50).unwrap(), 3.0);
        assert_eq!(s.distance_to_page(40).unwrap(), 2.0);
        assert_eq!(s.steps_taken(), 5);
    }

    #[test]
    fn test_no_upward_after_descent() {
        // R(1) ⊃ A(2) holds the start page; R ⊃ S(3); T(4) ⊃ S.
        // T is only reachable by climbing from S, which was entered downward.
        let mut b = CategoryGraphBuilder::new(en());
        b.add_subcategory(1, 2);
        b.add_subcategory(1, 3);
        b.add_subcategory(4, 3);
        let g = b.build().unwrap();
        let m = member_of(START, &[2]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        assert!(s.has_category_distance(3));
        assert!(!s.has_category_distance(4));
    }

    #[test]
    fn test_upward_route_through_descended_category() {
        // Start page in X(1, cost 1) and Y(2, cost 10).
        // Z(3) ⊃ X, Z ⊃ W(4), W ⊃ Y, V(5) ⊃ W; unit costs elsewhere.
        // W is first reached downward (X→Z→W = 3), but the upward route
        // Y→W (11) must still reach V at 12.
        let mut b = CategoryGraphBuilder::new(en());
        b.set_cost(2, 10.0);
        b.add_subcategory(3, 1);
        b.add_subcategory(3, 4);
        b.add_subcategory(4, 2);
        b.add_subcategory(5, 4);
        let g = b.build().unwrap();
        let m = member_of(START, &[1, 2]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        assert_eq!(s.distance_to_category(4).unwrap(), 3.0);
        assert_eq!(s.distance_to_category(2).unwrap(), 10.0);
        assert_eq!(s.distance_to_category(5).unwrap(), 12.0);
        assert_eq!(s.steps_taken(), 5);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut b = CategoryGraphBuilder::new(en());
        b.add_subcategory(1, 2);
        b.add_subcategory(2, 3);
        b.add_subcategory(3, 1);
        let g = b.build().unwrap();
        let m = member_of(START, &[1]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        assert!(!s.has_more_results());
        assert_eq!(s.steps_taken(), 3);
    }

    #[test]
    fn test_equal_distances_pop_in_seed_order() {
        let mut b = CategoryGraphBuilder::new(en());
        b.add_category(5, "Later");
        b.add_category(3, "Earlier");
        let g = b.build().unwrap();
        let m = member_of(START, &[5, 3]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));

        // Seeds are queued in ascending id order.
        assert_eq!(s.step().categories.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(s.step().categories.keys().copied().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_pages_untracked() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let mut s = search(&g, &m, SearchConfig::new(2).with_track_pages(false));
        let total = s.run(None);

        assert!(total.pages.is_empty());
        assert_eq!(total.categories.len(), 5);
        assert_eq!(s.page_distances().len(), 1);
    }

    #[test]
    fn test_duplicate_links_harmless() {
        let mut b = CategoryGraphBuilder::new(en());
        b.add_subcategory(1, 2);
        b.add_subcategory(1, 2);
        b.add_page(1, 7);
        b.add_page(1, 7);
        let g = b.build().unwrap();
        let m = member_of(START, &[2, 2]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        let total = s.run(None);

        assert_eq!(total.categories.len(), 2);
        assert_eq!(total.pages.get(&7), Some(&2.0));
        assert_eq!(s.steps_taken(), 2);
    }

    // --- Construction ---

    #[test]
    fn test_page_without_categories() {
        let g = make_family();
        let m = MembershipIndex::new();
        let mut s = search(&g, &m, SearchConfig::new(10));

        assert!(!s.has_more_results());
        assert!(s.step().is_empty());
        assert_eq!(s.distance_to_page(START).unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_membership_ignored() {
        let g = make_family();
        let m = member_of(START, &[3, 999]);
        let s = search(&g, &m, SearchConfig::new(10));
        assert_eq!(s.open_len(), 1);
    }

    #[test]
    fn test_lookup_failure_surfaces() {
        let g = make_family();
        let result = CategorySearch::new(&g, &FailingLookup, START, en(), SearchConfig::new(10));
        match result {
            Err(Error::Lookup { page, source, .. }) => {
                assert_eq!(page, START);
                assert!(source.to_string().contains("database unavailable"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected lookup failure"),
        }
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let result = CategorySearch::new(&g, &m, START, en(), SearchConfig::new(0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    // --- Accessors and exhaustion ---

    #[test]
    fn test_distance_errors_are_distinct() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let s = search(&g, &m, SearchConfig::new(10));

        assert!(matches!(
            s.distance_to_category(999),
            Err(Error::UnknownCategory(999))
        ));
        assert!(matches!(
            s.distance_to_category(3),
            Err(Error::CategoryDistanceUnavailable(3))
        ));
        assert!(matches!(
            s.distance_to_page(30),
            Err(Error::PageDistanceUnavailable(30))
        ));
        assert!(!s.has_category_distance(999));
    }

    #[test]
    fn test_step_after_exhaustion_is_noop() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        let pages = s.page_distances().clone();
        let steps = s.steps_taken();
        for _ in 0..5 {
            assert!(s.step().is_empty());
        }
        assert_eq!(s.page_distances(), &pages);
        assert_eq!(s.steps_taken(), steps);
    }

    #[test]
    fn test_run_respects_step_budget() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));

        let first = s.run(Some(2));
        assert_eq!(first.categories.len(), 2);
        assert!(s.has_more_results());

        let rest = s.run(None);
        assert_eq!(rest.categories.len(), 3);
        assert!(!s.has_more_results());
    }

    #[test]
    fn test_category_distances_keyed_by_id() {
        let g = make_family();
        let m = member_of(START, &[3]);
        let mut s = search(&g, &m, SearchConfig::new(usize::MAX));
        s.run(None);

        let mut ids: Vec<CategoryId> = s.category_distances().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_delta_helpers() {
        let mut a = VisitedDelta::default();
        assert!(a.is_empty());
        assert_eq!(a.max_page_distance(), None);

        a.pages.insert(1, 2.0);
        a.categories.insert(9, 1.5);
        let mut b = VisitedDelta::default();
        b.pages.insert(1, 1.0);
        b.pages.insert(2, 4.0);
        a.merge(b);

        assert_eq!(a.pages[&1], 1.0);
        assert_eq!(a.max_page_distance(), Some(4.0));
        assert_eq!(a.max_category_distance(), Some(1.5));
    }

    #[test]
    fn test_open_entry_ordering() {
        let mut heap = BinaryHeap::new();
        let entry = |index, distance, seq| OpenEntry {
            index,
            distance,
            direction: Direction::Up,
            seq,
        };
        heap.push(entry(0, 3.0, 0));
        heap.push(entry(1, 1.0, 1));
        heap.push(entry(2, 1.0, 2));
        heap.push(entry(3, 0.5, 3));

        let order: Vec<CategoryIndex> = std::iter::from_fn(|| heap.pop().map(|e| e.index)).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    // --- Reference comparison ---

    /// Brute-force up*-then-down* shortest distances by relaxing
    /// (category, direction) states until nothing changes.
    fn reference_distances(
        g: &CategoryGraph,
        seeds: &[CategoryIndex],
        explore: bool,
    ) -> HashMap<CategoryIndex, f64> {
        let n = g.category_count();
        let mut up = vec![f64::INFINITY; n];
        let mut down = vec![f64::INFINITY; n];
        for &s in seeds {
            up[s as usize] = up[s as usize].min(g.cost(s));
        }

        let mut changed = true;
        while changed {
            changed = false;
            for c in g.indices() {
                let (u, d) = (up[c as usize], down[c as usize]);
                if u.is_finite() {
                    for &p in g.parents(c) {
                        let cand = u + g.cost(p);
                        if cand < up[p as usize] {
                            up[p as usize] = cand;
                            changed = true;
                        }
                    }
                }
                if explore {
                    let best = u.min(d);
                    if best.is_finite() {
                        for &ch in g.children(c) {
                            let cand = best + g.cost(ch);
                            if cand < down[ch as usize] {
                                down[ch as usize] = cand;
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        g.indices()
            .filter_map(|c| {
                let best = up[c as usize].min(down[c as usize]);
                best.is_finite().then_some((c, best))
            })
            .collect()
    }

    #[derive(Debug, Clone)]
    struct Case {
        costs: Vec<u8>,
        edges: Vec<(usize, usize)>,
        pages: Vec<(usize, PageId)>,
        seeds: Vec<usize>,
        explore: bool,
    }

    fn arb_case() -> impl Strategy<Value = Case> {
        (1usize..9).prop_flat_map(|n| {
            (
                proptest::collection::vec(0u8..5, n),
                proptest::collection::vec((0..n, 0..n), 0..(2 * n + 1)),
                proptest::collection::vec((0..n, 1u64..20), 0..(2 * n + 1)),
                proptest::collection::vec(0..n, 1..3),
                any::<bool>(),
            )
                .prop_map(|(costs, edges, pages, seeds, explore)| Case {
                    costs,
                    edges,
                    pages,
                    seeds,
                    explore,
                })
        })
    }

    /// Category `i` gets id `i + 1` and index `i`.
    fn build_case(case: &Case) -> (CategoryGraph, MembershipIndex) {
        let mut b = CategoryGraphBuilder::new(en());
        for (i, &cost) in case.costs.iter().enumerate() {
            b.add_category(i as CategoryId + 1, "");
            b.set_cost(i as CategoryId + 1, cost as f64);
        }
        for &(p, c) in &case.edges {
            b.add_subcategory(p as CategoryId + 1, c as CategoryId + 1);
        }
        for &(c, page) in &case.pages {
            b.add_page(c as CategoryId + 1, page);
        }
        let seed_ids: Vec<CategoryId> = case.seeds.iter().map(|&s| s as CategoryId + 1).collect();
        (b.build().unwrap(), member_of(START, &seed_ids))
    }

    proptest! {
        #[test]
        fn prop_matches_reference(case in arb_case()) {
            let (g, m) = build_case(&case);
            let config = SearchConfig::new(usize::MAX).with_explore_descendants(case.explore);
            let mut s = CategorySearch::new(&g, &m, START, en(), config).unwrap();

            let mut order = Vec::new();
            while s.has_more_results() {
                let delta = s.step();
                prop_assert!(delta.categories.len() <= 1);
                order.extend(delta.categories.values().copied());
            }

            let seeds: Vec<CategoryIndex> = case.seeds.iter().map(|&i| i as CategoryIndex).collect();
            let expected = reference_distances(&g, &seeds, case.explore);

            prop_assert_eq!(s.steps_taken(), expected.len());
            for (&ci, &d) in &expected {
                prop_assert_eq!(s.distance_to_category(g.category_id(ci)).unwrap(), d);
            }

            // Finalization order never goes backwards.
            for w in order.windows(2) {
                prop_assert!(w[0] <= w[1], "distances decreased: {:?}", order);
            }

            // Pages: minimum over the categories holding them, start page at 0.
            let mut expected_pages: HashMap<PageId, f64> = HashMap::new();
            expected_pages.insert(START, 0.0);
            for (&ci, &d) in &expected {
                for &page in g.pages(ci) {
                    let slot = expected_pages.entry(page).or_insert(d);
                    *slot = slot.min(d);
                }
            }
            prop_assert_eq!(s.page_distances(), &expected_pages);
        }

        #[test]
        fn prop_page_cap_respected(case in arb_case(), cap in 1usize..6) {
            let (g, m) = build_case(&case);
            let config = SearchConfig::new(cap).with_explore_descendants(case.explore);
            let mut s = CategorySearch::new(&g, &m, START, en(), config).unwrap();
            let reachable = reference_distances(
                &g,
                &case.seeds.iter().map(|&i| i as CategoryIndex).collect::<Vec<_>>(),
                case.explore,
            )
            .len();

            let mut steps = 0usize;
            while s.has_more_results() {
                s.step();
                steps += 1;
                prop_assert!(steps <= reachable);
            }
            prop_assert!(s.page_distances().len() <= cap);
            prop_assert!(s.step().is_empty());
        }
    }
}
