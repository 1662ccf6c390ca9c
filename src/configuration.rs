use std::{fmt, path::Path, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::error::CheckError;

pub const SCRAPPYCITO_MAIN: &str = "http://scrappycito.com:9330";
pub const SCRAPPYCITO_ALT: &str = "http://tomasohara.trade:9330";

/// Bare environment names kept for older shell scripts, mapped onto settings
/// keys. Flags are normalised in [`legacy_overrides`].
const LEGACY_TEXT_VARS: [(&str, &str); 8] = [
    ("SCRAPPYCITO_URL", "application.base_url"),
    ("OUTPUT_DIRECTORY", "application.output_directory"),
    ("SLEEP_TIME", "scrape.sleep_time_secs"),
    ("EXPECTED_RESULTS_COUNT", "expectations.expected_results"),
    ("EXPECTED_RELEVANCE_RATIO", "expectations.relevance_threshold"),
    ("BROWSER_TIMEOUT", "browser.timeout_secs"),
    ("MAX_RETRIES", "browser.max_retries"),
    ("QUERY_WAIT_TIMEOUT", "scrape.query_wait_timeout_secs"),
];

const LEGACY_FLAG_VARS: [(&str, &str); 4] = [
    ("USE_ALTERNATIVE_URL", "application.use_alternate_url"),
    ("SELENIUM_HEADLESS", "browser.headless"),
    ("TAKE_SCREENSHOTS", "application.take_screenshots"),
    ("ADD_TIMESTAMP", "application.add_timestamp"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub browser: BrowserSettings,
    pub scrape: ScrapeSettings,
    pub expectations: Expectations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub base_url: String,
    pub alternate_url: String,
    pub use_alternate_url: bool,
    pub output_directory: PathBuf,
    pub take_screenshots: bool,
    pub add_timestamp: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    pub backend: BrowserBackend,
    pub fallback_backend: Option<BrowserBackend>,
    pub chrome_driver_url: String,
    pub firefox_driver_url: String,
    pub headless: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub query_wait_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sleep_time_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Expectations {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub expected_results: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub relevance_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    Firefox,
    Chrome,
}

impl fmt::Display for BrowserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserBackend::Firefox => write!(f, "firefox"),
            BrowserBackend::Chrome => write!(f, "chrome"),
        }
    }
}

impl ApplicationSettings {
    pub fn active_url(&self) -> &str {
        match self.use_alternate_url {
            true => &self.alternate_url,
            false => &self.base_url,
        }
    }
}

impl BrowserSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn driver_url(&self, backend: BrowserBackend) -> &str {
        match backend {
            BrowserBackend::Chrome => &self.chrome_driver_url,
            BrowserBackend::Firefox => &self.firefox_driver_url,
        }
    }
}

impl ScrapeSettings {
    pub fn query_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.query_wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn sleep_time(&self) -> Duration {
        Duration::from_secs(self.sleep_time_secs)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.browser.max_retries == 0 {
            return Err(CheckError::Config(
                "browser.max_retries must be greater than 0".into(),
            ));
        }
        if self.browser.timeout_secs == 0 {
            return Err(CheckError::Config(
                "browser.timeout_secs must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.expectations.relevance_threshold) {
            return Err(CheckError::Config(
                "expectations.relevance_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, CheckError> {
    let base_path = std::env::current_dir()?;
    let configuration_directory = base_path.join("configuration");
    let env: Map<String, String> = std::env::vars().collect();

    Ok(build_settings(&configuration_directory, &env)?)
}

/// Layers defaults, optional yaml files, legacy variables and `APP_` variables,
/// in that order of precedence. `env` stands in for the process environment.
pub fn build_settings(
    configuration_directory: &Path,
    env: &Map<String, String>,
) -> Result<Settings, ConfigError> {
    let environment = env
        .get("APP_ENVIRONMENT")
        .cloned()
        .unwrap_or_else(|| "local".to_string());

    let builder = Config::builder()
        .set_default("application.base_url", SCRAPPYCITO_MAIN)?
        .set_default("application.alternate_url", SCRAPPYCITO_ALT)?
        .set_default("application.use_alternate_url", false)?
        .set_default("application.output_directory", "./output")?
        .set_default("application.take_screenshots", false)?
        .set_default("application.add_timestamp", false)?
        .set_default("browser.backend", "firefox")?
        .set_default("browser.fallback_backend", "chrome")?
        .set_default("browser.chrome_driver_url", "http://localhost:9515")?
        .set_default("browser.firefox_driver_url", "http://localhost:4444")?
        .set_default("browser.headless", true)?
        .set_default("browser.timeout_secs", 30_i64)?
        .set_default("browser.max_retries", 3_i64)?
        .set_default("browser.retry_backoff_secs", 2_i64)?
        .set_default("scrape.query_wait_timeout_secs", 15_i64)?
        .set_default("scrape.poll_interval_millis", 500_i64)?
        .set_default("scrape.settle_secs", 2_i64)?
        .set_default("scrape.sleep_time_secs", 5_i64)?
        .set_default("expectations.expected_results", 10_i64)?
        .set_default("expectations.relevance_threshold", 0.5)?
        .add_source(File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            File::from(configuration_directory.join(format!("{}.yaml", environment)))
                .required(false),
        );

    // Legacy names fill in only what the APP_ variables leave unset.
    let mut merged: Map<String, String> = legacy_overrides(env)
        .into_iter()
        .map(|(key, value)| (app_var_name(key), value))
        .collect();
    merged.extend(env.clone());

    builder
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(merged)),
        )
        .build()?
        .try_deserialize::<Settings>()
}

fn app_var_name(key: &str) -> String {
    format!("APP_{}", key.replace('.', "__").to_uppercase())
}

fn legacy_overrides(env: &Map<String, String>) -> Vec<(&'static str, String)> {
    let mut overrides = vec![];

    for (var, key) in LEGACY_TEXT_VARS {
        if let Some(value) = env.get(var) {
            overrides.push((key, value.clone()));
        }
    }
    for (var, key) in LEGACY_FLAG_VARS {
        if let Some(flag) = env.get(var).and_then(|v| parse_flag(v)) {
            overrides.push((key, flag.to_string()));
        }
    }
    if let Some(use_chrome) = env.get("USE_CHROME_DRIVER").and_then(|v| parse_flag(v)) {
        let backend = match use_chrome {
            true => BrowserBackend::Chrome,
            false => BrowserBackend::Firefox,
        };
        overrides.push(("browser.backend", backend.to_string()));
    }

    overrides
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
