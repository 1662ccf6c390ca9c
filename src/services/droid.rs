use std::{path::Path, time::Duration};

use serde_json::{json, Value};
use thirtyfour::{error::WebDriverResult, CapabilitiesHelper, DesiredCapabilities, WebDriver};
use tokio::time::sleep;

use crate::{
    configuration::{BrowserBackend, BrowserSettings},
    error::{CheckError, Result},
};

const NAVIGATION_SETTLE: Duration = Duration::from_secs(1);

const CHROME_ARGS: [&str; 9] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "--disable-extensions",
    "--disable-infobars",
    "--disable-web-security",
    "--allow-running-insecure-content",
    "--ignore-certificate-errors",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Starting {
        backend: BrowserBackend,
        attempt: u32,
    },
    Ready {
        backend: BrowserBackend,
    },
    Degraded {
        backend: BrowserBackend,
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LaunchStep {
    Launch {
        backend: BrowserBackend,
        attempt: u32,
        delay: Duration,
    },
    GiveUp {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPolicy {
    pub backend: BrowserBackend,
    pub fallback: Option<BrowserBackend>,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&BrowserSettings> for LaunchPolicy {
    fn from(settings: &BrowserSettings) -> Self {
        LaunchPolicy {
            backend: settings.backend,
            fallback: settings.fallback_backend,
            max_retries: settings.max_retries,
            backoff: settings.retry_backoff(),
        }
    }
}

/// Retries the configured backend up to `max_retries` times with a fixed
/// backoff, then tries the fallback backend exactly once.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    policy: LaunchPolicy,
    state: SessionState,
    fallback_used: bool,
    failed_attempts: u32,
}

impl SessionLifecycle {
    pub fn new(policy: LaunchPolicy) -> Self {
        SessionLifecycle {
            policy,
            state: SessionState::Uninitialized,
            fallback_used: false,
            failed_attempts: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn begin(&mut self) -> LaunchStep {
        self.fallback_used = false;
        self.failed_attempts = 0;
        self.state = SessionState::Starting {
            backend: self.policy.backend,
            attempt: 1,
        };

        LaunchStep::Launch {
            backend: self.policy.backend,
            attempt: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn on_started(&mut self) {
        if let SessionState::Starting { backend, .. } = self.state {
            self.state = SessionState::Ready { backend };
        }
    }

    pub fn on_failed(&mut self, reason: &str) -> LaunchStep {
        let SessionState::Starting { backend, attempt } = self.state else {
            return self.fail(reason);
        };
        self.failed_attempts += 1;

        if !self.fallback_used && attempt < self.policy.max_retries {
            self.state = SessionState::Starting {
                backend,
                attempt: attempt + 1,
            };
            return LaunchStep::Launch {
                backend,
                attempt: attempt + 1,
                delay: self.policy.backoff,
            };
        }

        match self.policy.fallback {
            Some(fallback) if !self.fallback_used && fallback != backend => {
                log::warn!(
                    "{} setup failed after retries, falling back to {}",
                    backend,
                    fallback
                );
                self.fallback_used = true;
                self.state = SessionState::Starting {
                    backend: fallback,
                    attempt: 1,
                };
                LaunchStep::Launch {
                    backend: fallback,
                    attempt: 1,
                    delay: self.policy.backoff,
                }
            }
            _ => self.fail(reason),
        }
    }

    pub fn on_invalidated(&mut self, reason: &str) {
        if let SessionState::Ready { backend } = self.state {
            self.state = SessionState::Degraded {
                backend,
                reason: reason.to_string(),
            };
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Uninitialized;
    }

    fn fail(&mut self, reason: &str) -> LaunchStep {
        self.state = SessionState::Failed {
            reason: reason.to_string(),
        };
        LaunchStep::GiveUp {
            reason: reason.to_string(),
        }
    }
}

pub fn chrome_options(headless: bool) -> Value {
    let mut args: Vec<&str> = CHROME_ARGS.to_vec();
    if headless {
        args.push("--headless=new");
    }
    json!({ "args": args })
}

pub fn firefox_options(headless: bool) -> Value {
    let args: Vec<&str> = match headless {
        true => vec!["-headless"],
        false => vec![],
    };
    json!({
        "args": args,
        "prefs": {
            "browser.tabs.remote.autostart": false,
            "browser.tabs.remote.autostart.2": false,
            "app.update.auto": false,
            "app.update.enabled": false,
            "dom.ipc.processCount": 1,
            "browser.sessionstore.interval": 60000,
            "dom.max_script_run_time": 0,
            "browser.download.folderList": 2,
            "browser.download.manager.showWhenStarting": false,
            "browser.cache.disk.enable": false,
            "browser.cache.memory.enable": false,
            "browser.cache.offline.enable": false,
            "network.http.use-cache": false,
        }
    })
}

async fn launch(settings: &BrowserSettings, backend: BrowserBackend) -> WebDriverResult<WebDriver> {
    let server_url = settings.driver_url(backend);
    let driver = match backend {
        BrowserBackend::Chrome => {
            let mut caps = DesiredCapabilities::chrome();
            caps.insert_base_capability(
                "goog:chromeOptions".to_string(),
                chrome_options(settings.headless),
            );
            WebDriver::new(server_url, caps).await?
        }
        BrowserBackend::Firefox => {
            let mut caps = DesiredCapabilities::firefox();
            caps.insert_base_capability(
                "moz:firefoxOptions".to_string(),
                firefox_options(settings.headless),
            );
            WebDriver::new(server_url, caps).await?
        }
    };

    let timeout = settings.timeout();
    let configured = async {
        driver.set_page_load_timeout(timeout).await?;
        driver.set_script_timeout(timeout).await
    }
    .await;
    if let Err(e) = configured {
        if let Err(quit_err) = driver.quit().await {
            log::debug!("Error quitting half-started browser: {:?}", quit_err);
        }
        return Err(e);
    }

    log::info!(
        "Browser setup successful with {}s timeout",
        timeout.as_secs()
    );
    Ok(driver)
}

pub struct Droid {
    driver: Option<WebDriver>,
    lifecycle: SessionLifecycle,
    settings: BrowserSettings,
}

impl Droid {
    pub async fn new(settings: &BrowserSettings) -> Result<Self> {
        let mut droid = Droid {
            driver: None,
            lifecycle: SessionLifecycle::new(LaunchPolicy::from(settings)),
            settings: settings.clone(),
        };
        droid.start().await?;

        Ok(droid)
    }

    pub fn state(&self) -> &SessionState {
        self.lifecycle.state()
    }

    pub fn page(&self) -> Result<&WebDriver> {
        self.driver
            .as_ref()
            .ok_or_else(|| CheckError::Page("no active browser session".into()))
    }

    async fn start(&mut self) -> Result<()> {
        let mut step = self.lifecycle.begin();

        loop {
            match step {
                LaunchStep::Launch {
                    backend,
                    attempt,
                    delay,
                } => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    log::info!("Setting up {} browser (attempt {})", backend, attempt);

                    match launch(&self.settings, backend).await {
                        Ok(driver) => {
                            self.driver = Some(driver);
                            self.lifecycle.on_started();
                            return Ok(());
                        }
                        Err(e) => {
                            log::warn!("Browser setup attempt {} failed: {}", attempt, e);
                            step = self.lifecycle.on_failed(&e.to_string());
                        }
                    }
                }
                LaunchStep::GiveUp { reason } => {
                    log::error!("Could not start any browser: {}", reason);
                    return Err(CheckError::SessionFailed {
                        attempts: self.lifecycle.failed_attempts(),
                        reason,
                    });
                }
            }
        }
    }

    async fn restart(&mut self, reason: &str) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                log::debug!("Error quitting stale browser: {:?}", e);
            }
        }
        self.lifecycle.on_invalidated(reason);
        self.start().await
    }

    /// Restarts the session when the handle went stale.
    pub async fn ensure_alive(&mut self) -> Result<()> {
        let health = match &self.driver {
            Some(driver) => driver
                .current_url()
                .await
                .map(|url| log::debug!("Browser is active at {}", url))
                .map_err(|e| e.to_string()),
            None => Err("browser not initialized".to_string()),
        };

        if let Err(reason) = health {
            log::warn!("Browser session invalid, restarting: {}", reason);
            self.restart(&reason).await?;
        }
        Ok(())
    }

    async fn try_load(&mut self, url: &str) -> Result<String> {
        self.ensure_alive().await?;
        let driver = self.page()?;

        driver.goto(url).await?;
        sleep(NAVIGATION_SETTLE).await;
        let current_url = driver.current_url().await?;

        Ok(current_url.to_string())
    }

    /// Navigates to `url`, recreating the session between attempts. Gives
    /// `false` once every attempt failed.
    pub async fn load_page_with_retry(&mut self, url: &str) -> bool {
        let max_retries = self.settings.max_retries;

        for attempt in 1..=max_retries {
            log::info!("Attempt {}: Loading {}", attempt, url);

            match self.try_load(url).await {
                Ok(current_url) => {
                    log::info!("Successfully loaded: {}", current_url);
                    return true;
                }
                Err(e) => {
                    log::warn!("Error loading page (attempt {}): {}", attempt, e);
                    if let Err(e) = self.restart(&e.to_string()).await {
                        log::error!("Could not recreate browser session: {}", e);
                    }
                }
            }

            if attempt < max_retries {
                sleep(self.settings.retry_backoff() * attempt).await;
            }
        }

        log::error!("Failed to load page after {} attempts", max_retries);
        false
    }

    pub async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.ensure_alive().await?;
        self.page()?.screenshot(path).await?;
        Ok(())
    }

    /// A failed window close still quits the session.
    pub async fn close(&mut self) {
        let Some(driver) = self.driver.take() else {
            log::debug!("No active WebDriver instance to close");
            return;
        };

        match driver.close_window().await {
            Ok(_) => log::debug!("Browser window closed"),
            Err(e) => log::info!("Error closing browser window: {}", e),
        }
        match driver.quit().await {
            Ok(_) => log::debug!("WebDriver quit successfully"),
            Err(e) => log::info!("Error quitting WebDriver: {}", e),
        }

        self.lifecycle.reset();
    }
}
