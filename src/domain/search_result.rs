use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const TERM_SEPARATOR: &str = "; ";

/// The first term doubles as the snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub website: String,
    pub query_terms: Vec<String>,
    pub snippet: String,
    pub relevant: bool,
    pub relevant_terms: BTreeSet<String>,
}

impl SearchResult {
    pub fn new(title: &str, website: &str, query_terms: Vec<String>) -> Self {
        let snippet = query_terms.first().cloned().unwrap_or_default();

        SearchResult {
            title: title.to_string(),
            website: website.to_string(),
            query_terms,
            snippet,
            relevant: false,
            relevant_terms: BTreeSet::new(),
        }
    }

    /// `None` when the title or website cell is blank.
    pub fn from_cells(title: &str, website: &str, terms: &str) -> Option<Self> {
        let title = title.trim();
        let website = website.trim();
        if title.is_empty() || website.is_empty() {
            return None;
        }

        let query_terms = terms
            .trim()
            .split(TERM_SEPARATOR)
            .map(|term| term.to_string())
            .collect();

        Some(SearchResult::new(title, website, query_terms))
    }

    pub fn mark_relevance(&mut self, found_terms: BTreeSet<String>) -> bool {
        self.relevant = !found_terms.is_empty();
        self.relevant_terms = found_terms;
        self.relevant
    }
}
