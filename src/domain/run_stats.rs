use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    relevance::relevance_ratio, response_info::ResponseInfo, search_result::SearchResult,
};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStats {
    pub total_results: u64,
    pub query_time: f64,
}

/// Reads the first two numbers of the stats text as total results and
/// query time. `None` when the text holds no number at all.
pub fn parse_page_stats(text: &str) -> Option<PageStats> {
    let numbers: Vec<&str> = NUMBER.find_iter(text).map(|m| m.as_str()).collect();
    let first = numbers.first()?;

    // Only digits reach the parse, so the sole failure is overflow.
    let total_results = match first.split('.').next().unwrap_or(first).parse::<u64>() {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Total results {} out of range ({}), saturating", first, e);
            u64::MAX
        }
    };
    let query_time = numbers
        .get(1)
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(PageStats {
        total_results,
        query_time,
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunStatistics {
    pub total: usize,
    pub relevant: usize,
    pub relevance_ratio: f64,
    pub response_code: Option<u16>,
    pub response_message: Option<String>,
    pub page_stats: Option<PageStats>,
    /// Why the run produced fewer results than it could have.
    pub error: Option<String>,
}

impl RunStatistics {
    pub fn from_results(
        results: &[SearchResult],
        response: &ResponseInfo,
        page_stats: Option<PageStats>,
    ) -> Self {
        let total = results.len();
        let relevant = results.iter().filter(|r| r.relevant).count();

        RunStatistics {
            total,
            relevant,
            relevance_ratio: relevance_ratio(relevant, total),
            response_code: response.code,
            response_message: Some(response.message.clone()),
            page_stats,
            error: None,
        }
    }

    pub fn empty(response: Option<&ResponseInfo>, error: &str) -> Self {
        RunStatistics {
            response_code: response.and_then(|r| r.code),
            response_message: response.map(|r| r.message.clone()),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_text_yields_total_and_query_time() {
        let stats = parse_page_stats("About 1520 results (0.42 seconds)").unwrap();

        assert_eq!(stats.total_results, 1520);
        assert_eq!(stats.query_time, 0.42);
    }

    #[test]
    fn single_number_defaults_query_time() {
        let stats = parse_page_stats("Found 7 results").unwrap();

        assert_eq!(stats.total_results, 7);
        assert_eq!(stats.query_time, 0.0);
    }

    #[test]
    fn oversized_total_saturates_and_keeps_query_time() {
        let stats = parse_page_stats("99999999999999999999999 results (0.5 seconds)").unwrap();

        assert_eq!(stats.total_results, u64::MAX);
        assert_eq!(stats.query_time, 0.5);
    }

    #[test]
    fn no_numbers_means_no_stats() {
        assert!(parse_page_stats("no stats here").is_none());
    }

    #[test]
    fn from_results_counts_relevant() {
        let mut results = vec![
            SearchResult::new("a", "w", vec![]),
            SearchResult::new("b", "w", vec![]),
            SearchResult::new("c", "w", vec![]),
            SearchResult::new("d", "w", vec![]),
        ];
        results[0].mark_relevance(["a".to_string()].into_iter().collect());
        let response = ResponseInfo::from_code(200);
        let stats = RunStatistics::from_results(&results, &response, None);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.relevant, 1);
        assert_eq!(stats.relevance_ratio, 0.25);
        assert_eq!(stats.response_code, Some(200));
        assert_eq!(stats.response_message.as_deref(), Some("OK"));
    }

    #[test]
    fn empty_stats_carry_reason() {
        let stats = RunStatistics::empty(None, "Timeout waiting for results");

        assert_eq!(stats.total, 0);
        assert_eq!(stats.relevance_ratio, 0.0);
        assert_eq!(stats.error.as_deref(), Some("Timeout waiting for results"));
        assert!(stats.response_code.is_none());
    }
}
