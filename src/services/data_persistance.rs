use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use serde::Serialize;

use crate::{domain::report::TestResults, error::Result};

use super::suite::SuiteRecord;

const CSV_HEADER: &str = "Query,Results,Relevant,Relevance Ratio,Passed,Server";

pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub dir: PathBuf,
    pub results_file: PathBuf,
    pub screenshots_dir: PathBuf,
}

impl RunOutput {
    pub fn new(output_directory: &Path, timestamp: &str, add_timestamp: bool) -> Self {
        let dir = output_directory.join(format!("invoke_query_{}", timestamp));
        let results_name = match add_timestamp {
            true => format!("results_{}.json", timestamp),
            false => "results.json".to_string(),
        };

        RunOutput {
            results_file: dir.join(results_name),
            screenshots_dir: dir.join("screenshots"),
            dir,
        }
    }

    pub fn prepare(&self, with_screenshots: bool) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        if with_screenshots {
            fs::create_dir_all(&self.screenshots_dir)?;
        }
        log::info!("Output directory: {}", self.dir.display());
        Ok(())
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.screenshots_dir.join(name)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Writes the run report. Failures are logged, not raised.
pub fn save_test_results(path: &Path, results: &TestResults) -> bool {
    match write_json(path, results) {
        Ok(()) => {
            log::info!("Test results saved to {}", path.display());
            true
        }
        Err(e) => {
            log::error!("Error saving test results: {}", e);
            false
        }
    }
}

fn csv_field(value: &str) -> String {
    match value.contains([',', '"', '\n']) {
        true => format!("\"{}\"", value.replace('"', "\"\"")),
        false => value.to_string(),
    }
}

pub fn suite_csv(records: &[SuiteRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", CSV_HEADER);

    for record in records {
        let _ = writeln!(
            out,
            "{},{},{},{:.2},{},{}",
            csv_field(&record.query),
            record.results_count,
            record.relevant_count,
            record.relevance_ratio,
            if record.passed { "Pass" } else { "Fail" },
            csv_field(&record.server)
        );
    }
    out
}

/// Writes `{prefix}.json` and `{prefix}_summary.csv` into `dir`, giving the
/// JSON path on success.
pub fn save_suite_results(dir: &Path, prefix: &str, records: &[SuiteRecord]) -> Option<PathBuf> {
    let json_path = dir.join(format!("{}.json", prefix));
    let csv_path = dir.join(format!("{}_summary.csv", prefix));

    let saved = write_json(&json_path, &records)
        .and_then(|_| fs::write(&csv_path, suite_csv(records)).map_err(Into::into));

    match saved {
        Ok(()) => {
            log::info!("Results saved to {}", json_path.display());
            log::info!("Summary saved to {}", csv_path.display());
            Some(json_path)
        }
        Err(e) => {
            log::error!("Error saving suite results: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Expectations;

    fn record(query: &str, passed: bool) -> SuiteRecord {
        SuiteRecord {
            query: query.to_string(),
            timestamp: "2024-01-01T00:00:00".to_string(),
            url: format!("http://localhost/run_search?query={}", query),
            results_count: 4,
            relevant_count: 3,
            relevance_ratio: 0.75,
            min_results_required: 3,
            min_relevance_required: 0.7,
            passed,
            server: "http://localhost".to_string(),
            results: vec![],
        }
    }

    #[test]
    fn output_layout_follows_timestamp_flag() {
        let plain = RunOutput::new(Path::new("out"), "20240101_120000", false);
        assert_eq!(plain.dir, Path::new("out/invoke_query_20240101_120000"));
        assert_eq!(
            plain.results_file,
            Path::new("out/invoke_query_20240101_120000/results.json")
        );
        assert_eq!(
            plain.screenshot_path("initial_state.png"),
            Path::new("out/invoke_query_20240101_120000/screenshots/initial_state.png")
        );

        let stamped = RunOutput::new(Path::new("out"), "20240101_120000", true);
        assert!(stamped
            .results_file
            .ends_with("results_20240101_120000.json"));
    }

    #[test]
    fn timestamp_has_date_and_time_parts() {
        let ts = run_timestamp();

        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
    }

    #[test]
    fn saved_results_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let output = RunOutput::new(dir.path(), "ts", false);
        output.prepare(true).unwrap();
        let report = TestResults::new(&Expectations {
            expected_results: 3,
            relevance_threshold: 0.7,
        });

        assert!(save_test_results(&output.results_file, &report));
        assert!(output.screenshots_dir.is_dir());

        let text = fs::read_to_string(&output.results_file).unwrap();
        let loaded: TestResults = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn unwritable_path_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let report = TestResults::new(&Expectations {
            expected_results: 1,
            relevance_threshold: 0.5,
        });

        assert!(!save_test_results(&blocker.join("results.json"), &report));
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let csv = suite_csv(&[record("rust, \"fast\"", true), record("go", false)]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "\"rust, \"\"fast\"\"\",4,3,0.75,Pass,http://localhost"
        );
        assert_eq!(lines[2], "go,4,3,0.75,Fail,http://localhost");
    }

    #[test]
    fn suite_results_write_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let json_path =
            save_suite_results(dir.path(), "scrappycito_test_ts", &[record("go", true)]).unwrap();

        assert!(json_path.ends_with("scrappycito_test_ts.json"));
        assert!(dir.path().join("scrappycito_test_ts_summary.csv").is_file());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json[0]["query"], "go");
        assert_eq!(json[0]["passed"], true);
    }
}
