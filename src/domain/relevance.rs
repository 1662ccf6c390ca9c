//! Plain substring matching, so "cat" matches "category".

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::search_result::SearchResult;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

pub const FUNCTION_WORDS: [&str; 46] = [
    "the", "a", "an", "and", "but", "or", "nor", "for", "yet", "so", "of", "in", "to", "by", "at",
    "as", "with", "on", "from", "about", "into", "through", "after", "before", "during", "under",
    "over", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our", "their",
    "is", "am", "are", "was", "were", "be", "been", "being",
];

pub fn non_function_words(query: &str) -> HashSet<String> {
    let function_words: HashSet<&str> = FUNCTION_WORDS.into_iter().collect();
    let query = query.to_lowercase();

    WORD.find_iter(&query)
        .map(|m| m.as_str())
        .filter(|word| !function_words.contains(word))
        .map(|word| word.to_string())
        .collect()
}

/// Terms from `query_terms` found in the result's title and snippet.
pub fn matching_terms(
    title: &str,
    snippet: &str,
    query_terms: &HashSet<String>,
) -> BTreeSet<String> {
    let text = format!("{} {}", title, snippet).to_lowercase();

    query_terms
        .iter()
        .filter(|term| text.contains(&term.to_lowercase()))
        .cloned()
        .collect()
}

pub fn score_results(results: &mut [SearchResult], query: &str) -> usize {
    let query_terms = non_function_words(query);
    log::debug!("Non-function query terms: {:?}", query_terms);

    results
        .iter_mut()
        .map(|result| {
            let found = matching_terms(&result.title, &result.snippet, &query_terms);
            if found.is_empty() {
                log::debug!(
                    "No relevant terms found in result: {}",
                    result.title.chars().take(50).collect::<String>()
                );
            }
            result.mark_relevance(found)
        })
        .filter(|relevant| *relevant)
        .count()
}

pub fn relevance_ratio(relevant: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        total => relevant as f64 / total as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn function_word_list_is_complete() {
        let unique: HashSet<&str> = FUNCTION_WORDS.into_iter().collect();
        assert_eq!(unique.len(), FUNCTION_WORDS.len());
        assert!(unique.contains("being"));
    }

    #[test]
    fn removes_function_words() {
        let words = non_function_words("he is from the kingdom of wakanda");

        assert_eq!(words, set_of(&["he", "kingdom", "wakanda"]));
    }

    #[test]
    fn tokenizes_on_word_characters_and_lowercases() {
        let words = non_function_words("Rust-lang, THE Book: async/await!");

        assert_eq!(words, set_of(&["rust", "lang", "book", "async", "await"]));
    }

    #[test]
    fn query_of_only_function_words_is_empty() {
        assert!(non_function_words("of the and").is_empty());
    }

    #[test]
    fn substring_containment_counts_as_match() {
        let found = matching_terms("Category theory", "", &set_of(&["cat"]));

        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["cat"]);
    }

    #[test]
    fn matching_is_case_insensitive_over_title_and_snippet() {
        let terms = set_of(&["python", "programming", "snake"]);
        let found = matching_terms("Learn PYTHON", "Programming basics", &terms);

        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["programming", "python"]
        );
    }

    #[test]
    fn score_results_marks_each_result() {
        let mut results = vec![
            SearchResult::new("Python docs", "python.org", vec!["python".into()]),
            SearchResult::new("Gardening", "garden.com", vec!["roses".into()]),
        ];
        let relevant = score_results(&mut results, "python programming");

        assert_eq!(relevant, 1);
        assert!(results[0].relevant);
        assert!(!results[1].relevant);
        assert!(results[1].relevant_terms.is_empty());
    }

    #[test]
    fn ratio_is_zero_without_results() {
        assert_eq!(relevance_ratio(0, 0), 0.0);
        assert_eq!(relevance_ratio(5, 0), 0.0);
    }

    #[test]
    fn ratio_stays_within_unit_interval() {
        for total in 1..20 {
            for relevant in 0..=total {
                let ratio = relevance_ratio(relevant, total);
                assert!((0.0..=1.0).contains(&ratio));
                assert_eq!(ratio, relevant as f64 / total as f64);
            }
        }
    }
}
