use std::path::Path;

use crate::{
    configuration::{Expectations, Settings},
    domain::{
        report::TestResults,
        run_stats::RunStatistics,
        search_result::SearchResult,
        search_url::{build_search_url, ItsMe},
        verification::{verify, Verification},
    },
    error::Result,
};

use super::{
    droid::Droid,
    page_adapter::{CellTextAdapter, PageAdapter},
    result_scraper::{scrape_loaded_page, ScrapeOutcome},
};

pub const LOAD_FAILED: &str = "Failed to load page after retries";
pub const CONNECTION_FAILED: &str = "Connection failed";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRun {
    pub query: String,
    pub url: String,
    pub results: Vec<SearchResult>,
    pub stats: RunStatistics,
}

pub struct QueryInvoker {
    droid: Droid,
    adapter: Box<dyn PageAdapter>,
    base_url: String,
    expectations: Expectations,
    take_screenshots: bool,
    test_results: TestResults,
}

impl QueryInvoker {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let droid = Droid::new(&settings.browser).await?;
        let adapter = Box::new(CellTextAdapter::new(&settings.scrape));

        Ok(QueryInvoker::with_parts(droid, adapter, settings))
    }

    pub fn with_parts(droid: Droid, adapter: Box<dyn PageAdapter>, settings: &Settings) -> Self {
        QueryInvoker {
            droid,
            adapter,
            base_url: settings.application.active_url().to_string(),
            expectations: settings.expectations,
            take_screenshots: settings.application.take_screenshots,
            test_results: TestResults::new(&settings.expectations),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Points later queries at another server, e.g. after a server check.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.to_string();
    }

    pub fn create_url(
        &self,
        query: &str,
        its_me: ItsMe,
        extra_params: &[(String, String)],
    ) -> String {
        build_search_url(&self.base_url, query, its_me, extra_params)
    }

    pub fn set_expectations(&mut self, expectations: Expectations) {
        self.expectations = expectations;
        self.test_results = TestResults::new(&expectations);
    }

    pub fn expectations(&self) -> Expectations {
        self.expectations
    }

    pub async fn run_query(
        &mut self,
        query: &str,
        its_me: ItsMe,
        extra_params: &[(String, String)],
    ) -> QueryRun {
        let url = self.create_url(query, its_me, extra_params);
        log::info!("Navigating to: {}", url);

        let outcome = match self.droid.load_page_with_retry(&url).await {
            true => self.scrape_current_page(query).await,
            false => {
                log::error!("{}", LOAD_FAILED);
                let mut stats = RunStatistics::empty(None, LOAD_FAILED);
                stats.response_message = Some(CONNECTION_FAILED.to_string());
                ScrapeOutcome {
                    results: vec![],
                    stats,
                }
            }
        };

        let passed = verify(&outcome.stats, &self.expectations).passed();
        self.test_results = TestResults::new(&self.expectations);
        self.test_results.record(&outcome.stats, &outcome.results, passed);

        QueryRun {
            query: query.to_string(),
            url,
            results: outcome.results,
            stats: outcome.stats,
        }
    }

    async fn scrape_current_page(&self, query: &str) -> ScrapeOutcome {
        match self.droid.page() {
            Ok(page) => scrape_loaded_page(page, self.adapter.as_ref(), query).await,
            Err(e) => ScrapeOutcome {
                results: vec![],
                stats: RunStatistics::empty(None, &e.to_string()),
            },
        }
    }

    pub fn verify_results(&self, run: &QueryRun) -> Verification {
        let verification = verify(&run.stats, &self.expectations);
        match verification.passed() {
            true => log::info!("✓ Test PASSED - Results meet criteria"),
            false => log::warn!("✗ Test FAILED - {}", verification.reasons()),
        }
        verification
    }

    pub fn test_results(&self) -> &TestResults {
        &self.test_results
    }

    pub async fn take_screenshot(&mut self, path: &Path) -> bool {
        if !self.take_screenshots {
            log::debug!("Screenshots disabled, skipping {}", path.display());
            return false;
        }

        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("Failed to create screenshot directory: {}", e);
                return false;
            }
        }

        match self.droid.screenshot(path).await {
            Ok(()) => {
                log::info!("Screenshot saved to {}", path.display());
                true
            }
            Err(e) => {
                log::warn!("Failed to take screenshot: {}", e);
                false
            }
        }
    }

    pub async fn close(&mut self) {
        self.droid.close().await;
    }
}
