use std::collections::VecDeque;

/// Most-recent-first search history without duplicates.
#[derive(Debug, Clone)]
pub struct RecentSearches {
    terms: VecDeque<String>,
    capacity: usize,
}

impl RecentSearches {
    pub fn new(capacity: usize) -> Self {
        Self {
            terms: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Moves `term` to the front, evicting the oldest entry beyond capacity.
    pub fn record(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() || self.capacity == 0 {
            return;
        }
        self.terms.retain(|t| t != term);
        self.terms.push_front(term.to_string());
        self.terms.truncate(self.capacity);
    }

    pub fn remove(&mut self, term: &str) -> bool {
        let before = self.terms.len();
        self.terms.retain(|t| t != term);
        self.terms.len() != before
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }
}
