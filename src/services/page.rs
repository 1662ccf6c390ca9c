use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use thirtyfour::{By, WebDriver};
use tokio::time::{sleep, Instant};

use crate::error::{CheckError, Result};

const NAVIGATION_STATUS_SCRIPT: &str =
    "return window.performance.getEntries()[0].responseStatus || null;";

#[async_trait]
pub trait RenderedPage: Send + Sync {
    async fn count_class(&self, class: &str) -> Result<usize>;

    async fn class_texts(&self, class: &str) -> Result<Vec<String>>;

    /// Text of the element with this id, `None` if there is no such element.
    async fn id_text(&self, id: &str) -> Result<Option<String>>;

    async fn page_title(&self) -> Result<String>;

    async fn navigation_status(&self) -> Result<Option<u16>>;

    async fn page_source(&self) -> Result<String>;

    /// Polls until at least one element carries `class` or `timeout` runs out.
    async fn wait_for_class(&self, class: &str, timeout: Duration, poll: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.count_class(class).await? > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(poll.min(deadline.saturating_duration_since(Instant::now()))).await;
        }
    }
}

#[async_trait]
impl RenderedPage for WebDriver {
    async fn count_class(&self, class: &str) -> Result<usize> {
        Ok(self.find_all(By::ClassName(class)).await?.len())
    }

    async fn class_texts(&self, class: &str) -> Result<Vec<String>> {
        let mut texts = vec![];
        for element in self.find_all(By::ClassName(class)).await? {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn id_text(&self, id: &str) -> Result<Option<String>> {
        match self.find_all(By::Id(id)).await?.into_iter().next() {
            Some(element) => Ok(Some(element.text().await?)),
            None => Ok(None),
        }
    }

    async fn page_title(&self) -> Result<String> {
        Ok(self.title().await?)
    }

    async fn navigation_status(&self) -> Result<Option<u16>> {
        let ret = self.execute(NAVIGATION_STATUS_SCRIPT, Vec::new()).await?;
        Ok(ret
            .json()
            .as_u64()
            .and_then(|code| u16::try_from(code).ok()))
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.source().await?)
    }
}

/// A page source captured earlier, answered without a browser.
#[derive(Debug, Clone)]
pub struct HtmlSnapshot {
    source: String,
    status: Option<u16>,
}

impl HtmlSnapshot {
    pub fn new(source: impl Into<String>) -> Self {
        HtmlSnapshot {
            source: source.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    fn select_texts(&self, selector: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(selector)
            .map_err(|e| CheckError::Page(format!("invalid selector {}: {:?}", selector, e)))?;
        let document = Html::parse_document(&self.source);

        Ok(document
            .select(&selector)
            .map(|element| element.text().collect::<String>())
            .collect())
    }
}

#[async_trait]
impl RenderedPage for HtmlSnapshot {
    async fn count_class(&self, class: &str) -> Result<usize> {
        Ok(self.select_texts(&format!(".{}", class))?.len())
    }

    async fn class_texts(&self, class: &str) -> Result<Vec<String>> {
        self.select_texts(&format!(".{}", class))
    }

    async fn id_text(&self, id: &str) -> Result<Option<String>> {
        Ok(self.select_texts(&format!("#{}", id))?.into_iter().next())
    }

    async fn page_title(&self) -> Result<String> {
        Ok(self
            .select_texts("title")?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    async fn navigation_status(&self) -> Result<Option<u16>> {
        Ok(self.status)
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.source.clone())
    }
}
