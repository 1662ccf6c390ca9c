use std::fs;

use anyhow::Context;

use crate::{
    cli::Cli,
    configuration::Settings,
    domain::{
        report::{render_individual_results, render_summary, TestResults},
        verification::verify,
    },
    services::{
        data_persistance::{run_timestamp, save_suite_results, save_test_results, RunOutput},
        page::HtmlSnapshot,
        page_adapter::CellTextAdapter,
        query_invoker::{QueryInvoker, QueryRun},
        result_scraper::scrape_loaded_page,
        sentinel::Sentinel,
        suite::{default_cases, run_suite, summarize},
    },
};

const BOTH_SERVERS_DOWN: &str = "ALERT: BOTH SERVERS DOWN FOR SCRAPPYCITO";

/// `Ok(false)` means the checks ran and did not pass.
pub async fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    if cli.suite {
        return run_query_suite(settings).await;
    }

    let query = cli.query.as_deref().context("a query is required")?;
    match &cli.page_source {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read page source {}", path.display()))?;
            score_page_source(cli, settings, query, &source).await
        }
        None => run_single_query(cli, settings, query).await,
    }
}

fn prepare_output(cli: &Cli, settings: &Settings) -> anyhow::Result<Option<RunOutput>> {
    if !cli.output_enabled() {
        return Ok(None);
    }

    let output = RunOutput::new(
        &settings.application.output_directory,
        &run_timestamp(),
        settings.application.add_timestamp,
    );
    output
        .prepare(settings.application.take_screenshots)
        .context("Failed to create output directory")?;
    Ok(Some(output))
}

fn report(
    cli: &Cli,
    query: &str,
    run: &QueryRun,
    test_results: &TestResults,
    output: Option<&RunOutput>,
) -> bool {
    print!("{}", render_individual_results(query, &run.results));
    print!("{}", render_summary(query, &run.stats, test_results));
    let saved = persist(output, test_results);

    saved && (!cli.verify_stats() || test_results.passed)
}

/// A requested report that could not be written fails the run.
fn persist(output: Option<&RunOutput>, test_results: &TestResults) -> bool {
    let Some(output) = output else {
        return true;
    };

    match save_test_results(&output.results_file, test_results) {
        true => {
            println!("\nResults saved to directory: {}", output.dir.display());
            true
        }
        false => {
            println!(
                "\nFailed to save results to {}",
                output.results_file.display()
            );
            false
        }
    }
}

async fn run_single_query(cli: &Cli, settings: &Settings, query: &str) -> anyhow::Result<bool> {
    let output = prepare_output(cli, settings)?;
    let mut invoker = QueryInvoker::new(settings)
        .await
        .context("Failed to initialize browser")?;

    if let Some(output) = &output {
        invoker
            .take_screenshot(&output.screenshot_path("initial_state.png"))
            .await;
    }

    let run = invoker.run_query(query, cli.its_me, &cli.params).await;

    if let Some(output) = &output {
        invoker
            .take_screenshot(&output.screenshot_path("search_results.png"))
            .await;
    }
    if cli.verify_stats() {
        invoker.verify_results(&run);
    }

    let passed = report(cli, query, &run, invoker.test_results(), output.as_ref());
    invoker.close().await;

    Ok(passed)
}

async fn score_page_source(
    cli: &Cli,
    settings: &Settings,
    query: &str,
    source: &str,
) -> anyhow::Result<bool> {
    let output = prepare_output(cli, settings)?;
    let page = HtmlSnapshot::new(source);
    let outcome = scrape_loaded_page(&page, &CellTextAdapter::immediate(), query).await;

    let verification = verify(&outcome.stats, &settings.expectations);
    if cli.verify_stats() && !verification.passed() {
        log::warn!("✗ Test FAILED - {}", verification.reasons());
    }
    let mut test_results = TestResults::new(&settings.expectations);
    test_results.record(&outcome.stats, &outcome.results, verification.passed());

    let run = QueryRun {
        query: query.to_string(),
        url: String::new(),
        results: outcome.results,
        stats: outcome.stats,
    };
    Ok(report(cli, query, &run, &test_results, output.as_ref()))
}

async fn run_query_suite(settings: &Settings) -> anyhow::Result<bool> {
    let sentinel = Sentinel::new(
        &settings.application.base_url,
        &settings.application.alternate_url,
    );
    let status = sentinel.check_servers().await;
    let Some(server) = sentinel.active_url(&status) else {
        println!("{}", BOTH_SERVERS_DOWN);
        return Ok(false);
    };

    let mut invoker = QueryInvoker::new(settings)
        .await
        .context("Failed to initialize browser")?;
    invoker.set_base_url(server);

    let timestamp = run_timestamp();
    println!("\n============================================");
    println!("Starting ScrappyCito Tests at {}", timestamp);
    println!("============================================");

    let records = run_suite(&mut invoker, &default_cases(), settings.scrape.sleep_time()).await;
    invoker.close().await;

    let summary = summarize(&records);
    print!("{}", summary.render());

    let saved = save_suite_results(
        &settings.application.output_directory,
        &format!("scrappycito_test_{}", timestamp),
        &records,
    );
    if let Some(json_path) = saved {
        println!("\nResults saved to: {}", json_path.display());
    }

    match summary.succeeded() {
        true => println!("Test suite completed successfully"),
        false => println!("Test suite completed with failures"),
    }
    Ok(summary.succeeded())
}
