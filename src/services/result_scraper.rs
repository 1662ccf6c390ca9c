use crate::domain::{
    relevance::score_results,
    response_info::ResponseInfo,
    run_stats::RunStatistics,
    search_result::SearchResult,
};

use super::{
    page::RenderedPage,
    page_adapter::{PageAdapter, NOT_ENOUGH_RESULTS},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub results: Vec<SearchResult>,
    pub stats: RunStatistics,
}

/// Never fails. A page that cannot answer gives [`ResponseInfo::unknown`].
pub async fn response_info(page: &dyn RenderedPage) -> ResponseInfo {
    let status = match page.navigation_status().await {
        Ok(status) => status,
        Err(e) => {
            log::debug!("Navigation status unavailable: {}", e);
            None
        }
    };

    match page.page_title().await {
        Ok(title) => ResponseInfo::resolve(status, &title),
        Err(e) => {
            log::warn!("Error getting response info: {}", e);
            match status {
                Some(code) if code != 0 => ResponseInfo::from_code(code),
                _ => ResponseInfo::unknown(),
            }
        }
    }
}

pub async fn scrape_loaded_page(
    page: &dyn RenderedPage,
    adapter: &dyn PageAdapter,
    query: &str,
) -> ScrapeOutcome {
    let response = response_info(page).await;
    log::info!(
        "Response code: {}, Message: {}",
        response
            .code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        response.message
    );

    let extraction = match adapter.extract(page).await {
        Ok(extraction) => extraction,
        Err(e) => {
            log::error!("Error extracting search results: {}", e);
            return ScrapeOutcome {
                results: vec![],
                stats: RunStatistics::empty(Some(&response), &e.to_string()),
            };
        }
    };

    if extraction.results.is_empty() {
        let reason = extraction.reason.as_deref().unwrap_or(NOT_ENOUGH_RESULTS);
        return ScrapeOutcome {
            results: vec![],
            stats: RunStatistics::empty(Some(&response), reason),
        };
    }

    let mut results = extraction.results;
    let relevant = score_results(&mut results, query);
    log::info!("Found {} results, {} relevant", results.len(), relevant);

    let page_stats = adapter.page_stats(page).await;
    let mut stats = RunStatistics::from_results(&results, &response, page_stats);
    stats.error = extraction.reason;

    ScrapeOutcome { results, stats }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::response_info::RESPONSE_INFO_ERROR,
        error::{CheckError, Result},
        services::{page::HtmlSnapshot, page_adapter::CellTextAdapter},
    };

    /// A page whose browser session is gone. Only the navigation status may
    /// still be known.
    struct FailingPage {
        status: Option<u16>,
    }

    fn gone<T>() -> Result<T> {
        Err(CheckError::Page("page gone".into()))
    }

    #[async_trait]
    impl RenderedPage for FailingPage {
        async fn count_class(&self, _class: &str) -> Result<usize> {
            gone()
        }

        async fn class_texts(&self, _class: &str) -> Result<Vec<String>> {
            gone()
        }

        async fn id_text(&self, _id: &str) -> Result<Option<String>> {
            gone()
        }

        async fn page_title(&self) -> Result<String> {
            gone()
        }

        async fn navigation_status(&self) -> Result<Option<u16>> {
            match self.status {
                Some(code) => Ok(Some(code)),
                None => gone(),
            }
        }

        async fn page_source(&self) -> Result<String> {
            gone()
        }

        async fn wait_for_class(
            &self,
            _class: &str,
            _timeout: Duration,
            _poll: Duration,
        ) -> Result<bool> {
            gone()
        }
    }

    fn page_with_rows(rows: &[(&str, &str, &str)]) -> HtmlSnapshot {
        let cells: String = rows
            .iter()
            .map(|(title, site, terms)| {
                format!(
                    r#"<tr><td class="cell-text">{}</td><td class="cell-text">{}</td><td class="cell-text">{}</td></tr>"#,
                    title, site, terms
                )
            })
            .collect();
        HtmlSnapshot::new(format!(
            "<html><head><title>Results</title></head><body><table>{}</table></body></html>",
            cells
        ))
    }

    #[tokio::test]
    async fn scores_extracted_results() {
        let page = page_with_rows(&[
            ("Learn Rust", "rust-lang.org", "rust; book"),
            ("Gardening tips", "garden.com", "roses"),
        ]);
        let outcome = scrape_loaded_page(&page, &CellTextAdapter::immediate(), "rust").await;

        assert_eq!(outcome.stats.total, 2);
        assert_eq!(outcome.stats.relevant, 1);
        assert_eq!(outcome.stats.relevance_ratio, 0.5);
        assert_eq!(outcome.stats.response_code, Some(200));
        assert!(outcome.results[0].relevant);
        assert!(!outcome.results[1].relevant);
    }

    #[tokio::test]
    async fn missing_results_keep_the_reason() {
        let page = HtmlSnapshot::new("<html><head><title>404 Not Found</title></head></html>");
        let outcome = scrape_loaded_page(&page, &CellTextAdapter::immediate(), "rust").await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.stats.total, 0);
        assert_eq!(outcome.stats.relevance_ratio, 0.0);
        assert_eq!(outcome.stats.response_code, Some(404));
        assert_eq!(
            outcome.stats.error.as_deref(),
            Some("Timeout waiting for results")
        );
    }

    #[tokio::test]
    async fn navigation_status_beats_title() {
        let page = HtmlSnapshot::new("<title>fine</title>").with_status(503);

        assert_eq!(response_info(&page).await.code, Some(503));
    }

    #[tokio::test]
    async fn unreadable_page_gives_unknown_response() {
        let info = response_info(&FailingPage { status: None }).await;

        assert_eq!(info.code, None);
        assert_eq!(info.message, RESPONSE_INFO_ERROR);
    }

    #[tokio::test]
    async fn status_survives_a_failing_title() {
        let info = response_info(&FailingPage { status: Some(503) }).await;

        assert_eq!(info.code, Some(503));
        assert_eq!(info.message, "Service Unavailable");
    }

    #[tokio::test]
    async fn extraction_error_becomes_empty_stats() {
        let page = FailingPage { status: None };
        let outcome = scrape_loaded_page(&page, &CellTextAdapter::immediate(), "rust").await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.stats.total, 0);
        assert_eq!(outcome.stats.response_code, None);
        assert_eq!(
            outcome.stats.response_message.as_deref(),
            Some(RESPONSE_INFO_ERROR)
        );
        assert_eq!(
            outcome.stats.error.as_deref(),
            Some("page error: page gone")
        );
    }

    #[tokio::test]
    async fn partial_extraction_keeps_results_and_reason() {
        let page = page_with_rows(&[
            ("Learn Rust", "rust-lang.org", "rust; book"),
            ("", "blank.com", "rust"),
        ]);
        let outcome = scrape_loaded_page(&page, &CellTextAdapter::immediate(), "rust").await;

        assert_eq!(outcome.stats.total, 1);
        assert_eq!(outcome.stats.relevant, 1);
        assert_eq!(
            outcome.stats.error.as_deref(),
            Some("Skipped 1 of 2 results with a blank title or website")
        );
    }
}
