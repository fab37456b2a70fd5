//! Round-robin stepping of many independent searches.
//!
//! Searches are cooperative: nothing runs unless `step()` is called. A batch
//! gives each live search one step per round, so a single search over a
//! dense part of the hierarchy cannot starve the others.

use crate::traversal::{CategorySearch, VisitedDelta};

pub struct SearchBatch<'g, K> {
    searches: Vec<(K, CategorySearch<'g>)>,
    rounds: usize,
}

impl<'g, K: Clone + PartialEq> SearchBatch<'g, K> {
    pub fn new() -> Self {
        Self {
            searches: Vec::new(),
            rounds: 0,
        }
    }

    pub fn push(&mut self, key: K, search: CategorySearch<'g>) {
        self.searches.push((key, search));
    }

    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }

    /// True when no search has results left.
    pub fn is_exhausted(&self) -> bool {
        self.searches.iter().all(|(_, s)| !s.has_more_results())
    }

    /// Number of rounds run so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Step every live search once, in insertion order.
    pub fn step_round(&mut self) -> Vec<(K, VisitedDelta)> {
        let mut deltas = Vec::new();
        for (key, search) in &mut self.searches {
            if search.has_more_results() {
                deltas.push((key.clone(), search.step()));
            }
        }
        self.rounds += 1;
        deltas
    }

    /// Run rounds until every search is exhausted or `max_rounds` rounds have
    /// run. Returns the number of rounds executed by this call.
    pub fn run(&mut self, max_rounds: Option<usize>) -> usize {
        let mut executed = 0usize;
        while !self.is_exhausted() && max_rounds.map_or(true, |max| executed < max) {
            self.step_round();
            executed += 1;
        }
        tracing::debug!(
            searches = self.searches.len(),
            executed,
            exhausted = self.is_exhausted(),
            "batch run finished"
        );
        executed
    }

    pub fn get(&self, key: &K) -> Option<&CategorySearch<'g>> {
        self.searches
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CategorySearch<'g>)> {
        self.searches.iter().map(|(k, s)| (k, s))
    }

    pub fn into_searches(self) -> Vec<(K, CategorySearch<'g>)> {
        self.searches
    }
}

impl<'g, K: Clone + PartialEq> Default for SearchBatch<'g, K> {
    fn default() -> Self {
        Self::new()
    }
}
