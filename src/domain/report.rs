use std::fmt::Write;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::configuration::Expectations;

use super::{run_stats::RunStatistics, search_result::SearchResult};

const WIDE_RULE: usize = 60;
const NARROW_RULE: usize = 40;

/// The JSON document persisted for one query run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub passed: bool,
    pub total_results: usize,
    pub relevant_results: usize,
    pub relevance_ratio: f64,
    pub expected_results: usize,
    pub expected_relevance: f64,
    pub response_code: Option<u16>,
    pub response_message: Option<String>,
    pub error: Option<String>,
    pub individual_results: Vec<SearchResult>,
}

impl TestResults {
    pub fn new(expectations: &Expectations) -> Self {
        TestResults {
            passed: false,
            total_results: 0,
            relevant_results: 0,
            relevance_ratio: 0.0,
            expected_results: expectations.expected_results,
            expected_relevance: expectations.relevance_threshold,
            response_code: None,
            response_message: None,
            error: None,
            individual_results: vec![],
        }
    }

    pub fn record(&mut self, stats: &RunStatistics, results: &[SearchResult], passed: bool) {
        self.passed = passed;
        self.total_results = stats.total;
        self.relevant_results = stats.relevant;
        self.relevance_ratio = stats.relevance_ratio;
        self.response_code = stats.response_code;
        self.response_message = stats.response_message.clone();
        self.error = stats.error.clone();
        self.individual_results = results.to_vec();
    }
}

pub fn render_individual_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "INDIVIDUAL SEARCH RESULTS FOR QUERY: '{}'", query);
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));

    if results.is_empty() {
        let _ = writeln!(out, "No results found.");
        return out;
    }

    for (i, result) in results.iter().enumerate() {
        let (marker, status) = match result.relevant {
            true => ("✓", "✓ RELEVANT"),
            false => ("✗", "✗ NOT RELEVANT"),
        };

        let _ = writeln!(out, "\nResult {}: {}", i + 1, marker);
        let _ = writeln!(out, "  Title: {}", result.title);
        let _ = writeln!(out, "  Website: {}", result.website);
        let _ = writeln!(out, "  Query Terms: {}", result.query_terms.iter().join(", "));
        if result.relevant && !result.relevant_terms.is_empty() {
            let _ = writeln!(
                out,
                "  Relevant Terms Found: {}",
                result.relevant_terms.iter().join(", ")
            );
        }
        let _ = writeln!(out, "  Relevance: {}", status);
        let _ = writeln!(out, "{}", "-".repeat(NARROW_RULE));
    }

    out
}

pub fn render_summary(query: &str, stats: &RunStatistics, report: &TestResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "SUMMARY FOR SEARCH QUERY: '{}'", query);
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "Total Results: {}", stats.total);
    let _ = writeln!(out, "Relevant Results: {}", stats.relevant);
    let _ = writeln!(out, "Relevance Ratio: {:.2}", stats.relevance_ratio);
    let _ = writeln!(
        out,
        "Response Code: {}",
        stats
            .response_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    );
    let _ = writeln!(
        out,
        "Response Message: {}",
        stats.response_message.as_deref().unwrap_or("Unknown")
    );
    if let Some(page_stats) = &stats.page_stats {
        let _ = writeln!(out, "Query Time: {:.2} seconds", page_stats.query_time);
    }
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));

    match report.passed {
        true => {
            let _ = writeln!(out, "✓ TEST PASSED - Results meet expectations");
        }
        false => {
            let _ = writeln!(out, "✗ TEST FAILED - Results do not meet expectations");
            if let Some(error) = &report.error {
                let _ = writeln!(out, "Error: {}", error);
            }
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));

    out
}
