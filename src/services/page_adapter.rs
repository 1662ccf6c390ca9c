//! Each hit is rendered as three consecutive `cell-text` elements: title,
//! website and a "; " joined term list.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    configuration::ScrapeSettings,
    domain::{
        run_stats::{parse_page_stats, PageStats},
        search_result::SearchResult,
    },
    error::Result,
};

use super::page::RenderedPage;

pub const MARKER_CLASS: &str = "cell-text";
pub const STATS_ID: &str = "search-stats";
pub const CELLS_PER_RESULT: usize = 3;

pub const NO_RESULTS_TIMEOUT: &str = "Timeout waiting for results";
pub const NOT_ENOUGH_RESULTS: &str = "Not enough search results";
pub const NO_COMPLETE_RESULTS: &str = "No result had both a title and a website";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub results: Vec<SearchResult>,
    /// Why cells were left out. With no results, why the page gave nothing.
    pub reason: Option<String>,
}

impl Extraction {
    pub fn empty(reason: &str) -> Self {
        Extraction {
            results: vec![],
            reason: Some(reason.to_string()),
        }
    }
}

#[async_trait]
pub trait PageAdapter: Send + Sync {
    async fn extract(&self, page: &dyn RenderedPage) -> Result<Extraction>;

    async fn page_stats(&self, page: &dyn RenderedPage) -> Option<PageStats>;
}

pub struct CellTextAdapter {
    marker_class: String,
    stats_id: String,
    wait_timeout: Duration,
    poll_interval: Duration,
    settle: Duration,
}

impl CellTextAdapter {
    pub fn new(settings: &ScrapeSettings) -> Self {
        CellTextAdapter {
            marker_class: MARKER_CLASS.to_string(),
            stats_id: STATS_ID.to_string(),
            wait_timeout: settings.query_wait_timeout(),
            poll_interval: settings.poll_interval(),
            settle: settings.settle(),
        }
    }

    /// Adapter for pages that are already complete, such as saved sources.
    pub fn immediate() -> Self {
        CellTextAdapter {
            marker_class: MARKER_CLASS.to_string(),
            stats_id: STATS_ID.to_string(),
            wait_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

#[async_trait]
impl PageAdapter for CellTextAdapter {
    async fn extract(&self, page: &dyn RenderedPage) -> Result<Extraction> {
        let found = page
            .wait_for_class(&self.marker_class, self.wait_timeout, self.poll_interval)
            .await?;
        if !found {
            log::warn!(
                "Timeout waiting for results after {} seconds",
                self.wait_timeout.as_secs()
            );
            return Ok(Extraction::empty(NO_RESULTS_TIMEOUT));
        }
        log::info!("Results found on the page");

        if !self.settle.is_zero() {
            sleep(self.settle).await;
        }

        let cells = page.class_texts(&self.marker_class).await?;
        Ok(group_cells(&cells))
    }

    async fn page_stats(&self, page: &dyn RenderedPage) -> Option<PageStats> {
        match page.id_text(&self.stats_id).await {
            Ok(Some(text)) => {
                log::info!("Found stats: {}", text);
                parse_page_stats(&text)
            }
            Ok(None) => {
                log::info!("No search stats element found");
                None
            }
            Err(e) => {
                log::warn!("Error reading search stats: {}", e);
                None
            }
        }
    }
}

/// Groups marker texts into consecutive (title, website, terms) triples.
/// A trailing incomplete triple is dropped and triples with a blank title
/// or website are skipped. Either loss is named in the reason.
pub fn group_cells(cells: &[String]) -> Extraction {
    if cells.len() < CELLS_PER_RESULT {
        log::warn!("Not enough search results found ({} elements)", cells.len());
        return Extraction::empty(NOT_ENOUGH_RESULTS);
    }
    log::debug!("Found {} elements", cells.len());

    let chunks = cells.chunks_exact(CELLS_PER_RESULT);
    let leftover = chunks.remainder().len();
    let complete = chunks.len();

    let results: Vec<SearchResult> = chunks
        .enumerate()
        .filter_map(|(i, cells)| {
            let result = SearchResult::from_cells(&cells[0], &cells[1], &cells[2]);
            if result.is_none() {
                log::debug!("Skipping result {} with blank title or website", i);
            }
            result
        })
        .collect();

    if results.is_empty() {
        log::warn!("All {} results had a blank title or website", complete);
        return Extraction::empty(NO_COMPLETE_RESULTS);
    }

    let mut notes = vec![];
    let skipped = complete - results.len();
    if skipped > 0 {
        notes.push(format!(
            "Skipped {} of {} results with a blank title or website",
            skipped, complete
        ));
    }
    if leftover > 0 {
        log::warn!("Dropping {} trailing elements of an incomplete result", leftover);
        notes.push(format!(
            "Dropped {} trailing cells of an incomplete result",
            leftover
        ));
    }

    Extraction {
        results,
        reason: match notes.is_empty() {
            true => None,
            false => Some(notes.join("; ")),
        },
    }
}
