use std::path::PathBuf;

use clap::Parser;

use crate::{
    configuration::{BrowserBackend, Settings},
    domain::search_url::ItsMe,
};

#[derive(Debug, Parser)]
#[command(name = "searchprobe")]
#[command(about = "Checks that a Scrappycito search returns enough relevant results")]
#[command(version)]
pub struct Cli {
    /// Search query to run
    #[arg(required_unless_present = "suite")]
    pub query: Option<String>,

    /// Write results and screenshots to the output directory
    #[arg(long)]
    pub output: bool,

    /// Directory for result files (implies --output)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Minimum share of relevant results
    #[arg(long, value_name = "F")]
    pub relevance_threshold: Option<f64>,

    /// Minimum number of results
    #[arg(long, value_name = "N")]
    pub expected_results: Option<usize>,

    /// Run the browser headless regardless of configuration
    #[arg(long)]
    pub headless: bool,

    /// Skip pass/fail verification; the exit status is then always 0
    #[arg(long)]
    pub no_verify_stats: bool,

    #[arg(long)]
    pub take_screenshots: bool,

    /// Put the run timestamp in the results file name
    #[arg(long)]
    pub add_timestamp: bool,

    /// Use Chrome instead of the configured backend
    #[arg(long)]
    pub chrome: bool,

    /// Query the alternate server
    #[arg(long)]
    pub alternate_url: bool,

    #[arg(long, value_name = "S")]
    pub browser_timeout: Option<u64>,

    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Value of the its-me parameter (on or off)
    #[arg(long, default_value = "on")]
    pub its_me: ItsMe,

    /// Extra query parameter, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Score a saved results page instead of opening a browser
    #[arg(long, value_name = "FILE", conflicts_with = "suite")]
    pub page_source: Option<PathBuf>,

    /// Run the built-in query suite
    #[arg(long)]
    pub suite: bool,

    #[arg(long, short)]
    pub verbose: bool,
}

pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

impl Cli {
    pub fn output_enabled(&self) -> bool {
        self.output || self.output_dir.is_some()
    }

    pub fn verify_stats(&self) -> bool {
        !self.no_verify_stats
    }

    /// Folds the flags that were given into `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.output_dir {
            settings.application.output_directory = dir.clone();
        }
        if let Some(threshold) = self.relevance_threshold {
            settings.expectations.relevance_threshold = threshold;
        }
        if let Some(expected) = self.expected_results {
            settings.expectations.expected_results = expected;
        }
        if self.headless {
            settings.browser.headless = true;
        }
        if self.take_screenshots {
            settings.application.take_screenshots = true;
        }
        if self.add_timestamp {
            settings.application.add_timestamp = true;
        }
        if self.chrome {
            settings.browser.backend = BrowserBackend::Chrome;
        }
        if self.alternate_url {
            settings.application.use_alternate_url = true;
        }
        if let Some(timeout) = self.browser_timeout {
            settings.browser.timeout_secs = timeout;
        }
        if let Some(max_retries) = self.max_retries {
            settings.browser.max_retries = max_retries;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::build_settings;

    fn defaults() -> Settings {
        let dir = tempfile::tempdir().unwrap();
        build_settings(dir.path(), &Default::default()).unwrap()
    }

    #[test]
    fn query_is_required_without_suite() {
        assert!(Cli::try_parse_from(["searchprobe"]).is_err());
        assert!(Cli::try_parse_from(["searchprobe", "--suite"]).is_ok());
    }

    #[test]
    fn params_are_repeatable_pairs() {
        let cli = Cli::try_parse_from([
            "searchprobe",
            "rust",
            "--param",
            "page=2",
            "--param",
            "lang=en",
            "--its-me",
            "off",
        ])
        .unwrap();

        assert_eq!(
            cli.params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("lang".to_string(), "en".to_string())
            ]
        );
        assert_eq!(cli.its_me, ItsMe::Off);
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "searchprobe",
            "rust",
            "--output-dir",
            "/tmp/checks",
            "--relevance-threshold",
            "0.9",
            "--expected-results",
            "5",
            "--chrome",
            "--max-retries",
            "1",
        ])
        .unwrap();
        let mut settings = defaults();
        cli.apply(&mut settings);

        assert!(cli.output_enabled());
        assert_eq!(
            settings.application.output_directory,
            PathBuf::from("/tmp/checks")
        );
        assert_eq!(settings.expectations.relevance_threshold, 0.9);
        assert_eq!(settings.expectations.expected_results, 5);
        assert_eq!(settings.browser.backend, BrowserBackend::Chrome);
        assert_eq!(settings.browser.max_retries, 1);
    }

    #[test]
    fn flag_repairs_an_invalid_environment_value() {
        let dir = tempfile::tempdir().unwrap();
        let env = [("EXPECTED_RELEVANCE_RATIO".to_string(), "1.5".to_string())]
            .into_iter()
            .collect();
        let mut settings = build_settings(dir.path(), &env).unwrap();
        assert!(settings.validate().is_err());

        let cli =
            Cli::try_parse_from(["searchprobe", "rust", "--relevance-threshold", "0.6"]).unwrap();
        cli.apply(&mut settings);

        assert_eq!(settings.expectations.relevance_threshold, 0.6);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn absent_flags_leave_settings_alone() {
        let cli = Cli::try_parse_from(["searchprobe", "rust"]).unwrap();
        let mut settings = defaults();
        let before = settings.clone();
        cli.apply(&mut settings);

        assert!(!cli.output_enabled());
        assert!(cli.verify_stats());
        assert_eq!(settings.browser.backend, before.browser.backend);
        assert_eq!(settings.browser.headless, before.browser.headless);
        assert_eq!(settings.expectations, before.expectations);
    }

    #[test]
    fn page_source_conflicts_with_suite() {
        let parsed = Cli::try_parse_from(["searchprobe", "--suite", "--page-source", "x.html"]);

        assert!(parsed.is_err());
    }
}
