use std::{fmt::Write as _, time::Duration};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::Expectations,
    domain::{search_result::SearchResult, search_url::ItsMe},
};

use super::query_invoker::{QueryInvoker, QueryRun};

/// Share of passing cases, in percent, for the whole suite to pass.
pub const SUCCESS_RATE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteCase {
    pub query: String,
    pub expectations: Expectations,
}

impl SuiteCase {
    pub fn new(query: &str, expected_results: usize, relevance_threshold: f64) -> Self {
        SuiteCase {
            query: query.to_string(),
            expectations: Expectations {
                expected_results,
                relevance_threshold,
            },
        }
    }
}

pub fn default_cases() -> Vec<SuiteCase> {
    vec![
        SuiteCase::new("python programming", 3, 0.7),
        SuiteCase::new("machine learning", 3, 0.7),
        SuiteCase::new("artificial intelligence", 3, 0.7),
        SuiteCase::new("natural language processing", 2, 0.6),
        SuiteCase::new("web scraping", 2, 0.7),
        SuiteCase::new("data analysis", 3, 0.6),
        SuiteCase::new("computer science", 3, 0.7),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteRecord {
    pub query: String,
    pub timestamp: String,
    pub url: String,
    pub results_count: usize,
    pub relevant_count: usize,
    pub relevance_ratio: f64,
    pub min_results_required: usize,
    pub min_relevance_required: f64,
    pub passed: bool,
    pub server: String,
    pub results: Vec<SearchResult>,
}

impl SuiteRecord {
    pub fn from_run(run: &QueryRun, case: &SuiteCase, server: &str, passed: bool) -> Self {
        SuiteRecord {
            query: run.query.clone(),
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            url: run.url.clone(),
            results_count: run.stats.total,
            relevant_count: run.stats.relevant,
            relevance_ratio: run.stats.relevance_ratio,
            min_results_required: case.expectations.expected_results,
            min_relevance_required: case.expectations.relevance_threshold,
            passed,
            server: server.to_string(),
            results: run.results.clone(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nTest Results for '{}':", self.query);
        let _ = writeln!(
            out,
            "  Results: {} (minimum: {})",
            self.results_count, self.min_results_required
        );
        let _ = writeln!(out, "  Relevant: {}", self.relevant_count);
        let _ = writeln!(
            out,
            "  Relevance Ratio: {:.2} (minimum: {:.2})",
            self.relevance_ratio, self.min_relevance_required
        );
        let _ = writeln!(
            out,
            "  {}",
            if self.passed { "✓ PASSED" } else { "✗ FAILED" }
        );
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub success_rate: f64,
}

impl SuiteSummary {
    pub fn succeeded(&self) -> bool {
        self.success_rate >= SUCCESS_RATE_THRESHOLD
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(44);
        format!(
            "\n{}\nTest Summary: {}/{} tests passed ({:.1}%)\n{}\n",
            rule, self.passed, self.total, self.success_rate, rule
        )
    }
}

pub fn summarize(records: &[SuiteRecord]) -> SuiteSummary {
    let total = records.len();
    let passed = records.iter().filter(|r| r.passed).count();
    let success_rate = match total {
        0 => 0.0,
        _ => passed as f64 * 100.0 / total as f64,
    };

    SuiteSummary {
        total,
        passed,
        success_rate,
    }
}

pub async fn run_suite(
    invoker: &mut QueryInvoker,
    cases: &[SuiteCase],
    pause: Duration,
) -> Vec<SuiteRecord> {
    let mut records = Vec::with_capacity(cases.len());
    let server = invoker.base_url().to_string();

    for (i, case) in cases.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        log::info!("Testing query: '{}'", case.query);
        invoker.set_expectations(case.expectations);

        let run = invoker.run_query(&case.query, ItsMe::default(), &[]).await;
        let passed = invoker.verify_results(&run).passed();
        let record = SuiteRecord::from_run(&run, case, &server, passed);

        print!("{}", record.render());
        records.push(record);
    }

    records
}
