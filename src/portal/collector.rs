use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, SetDownloadBehaviorBehavior,
    SetDownloadBehaviorParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::download;
use crate::error::CollectorError;
use crate::traits::Collector;

use super::types::{
    period_select_value, DocumentKind, SelectOutcome, CATEGORY_SELECT, CATEGORY_VALUE,
    CONFIRM_DOWNLOAD, EXPORT_GROUP_BUTTON, SEARCH_BUTTON, XLS_OPTION, YEAR_SELECT,
};

/// Upper bound on waiting for a single download to complete after the
/// confirm click.
const DOWNLOAD_WAIT_SECS: u64 = 30;

/// Collector for the MPAM transparency portal.
pub struct PortalCollector {
    config: CollectorConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl PortalCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
        }
    }

    fn get_page(&self) -> Result<&Arc<Page>, CollectorError> {
        self.page
            .as_ref()
            .ok_or_else(|| CollectorError::BrowserInit("browser not initialized".into()))
    }

    fn get_browser(&self) -> Result<&Browser, CollectorError> {
        self.browser
            .as_ref()
            .ok_or_else(|| CollectorError::BrowserInit("browser not initialized".into()))
    }

    async fn settle(&self) {
        sleep(self.config.time_between_steps).await;
    }

    /// Sets a grid select to `value`, reporting whether the option existed.
    /// An absent option is the portal's empty-state for the period, not a
    /// transport failure.
    async fn set_select(
        &self,
        page: &Page,
        selector: &str,
        value: &str,
    ) -> Result<SelectOutcome, CollectorError> {
        let script = set_select_script(selector, value);
        let outcome = page
            .evaluate(script.as_str())
            .await
            .map_err(|e| CollectorError::JavaScript(e.to_string()))?
            .into_value::<SelectOutcome>()
            .map_err(|e| CollectorError::JavaScript(format!("select outcome: {e}")))?;
        debug!("set {} = {:?}: {:?}", selector, value, outcome);
        Ok(outcome)
    }

    /// Navigates to the kind's grid and runs the period search.
    async fn select_period(&self, kind: DocumentKind) -> Result<(), CollectorError> {
        let page = self.get_page()?.clone();
        let spec = kind.spec();
        let period = self.config.period();

        info!("Selecting period {} on {} grid...", period, spec.label);
        page.goto(spec.base_url)
            .await
            .map_err(|e| CollectorError::Navigation(e.to_string()))?;
        self.settle().await;

        let value = period_select_value(self.config.month, self.config.year);
        match self.set_select(&page, YEAR_SELECT, &value).await? {
            SelectOutcome::Ok => {}
            SelectOutcome::NoOption => {
                return Err(CollectorError::NoData(format!(
                    "no {} records for {}",
                    spec.label, period
                )));
            }
            SelectOutcome::NoElement => {
                return Err(CollectorError::ElementNotFound(format!(
                    "period select {} on {}",
                    YEAR_SELECT, spec.base_url
                )));
            }
        }
        self.settle().await;

        if spec.requires_category {
            match self.set_select(&page, CATEGORY_SELECT, CATEGORY_VALUE).await? {
                SelectOutcome::Ok => {}
                SelectOutcome::NoOption => {
                    return Err(CollectorError::NoData(format!(
                        "no active-member category for {}",
                        period
                    )));
                }
                SelectOutcome::NoElement => {
                    return Err(CollectorError::ElementNotFound(format!(
                        "category select {} on {}",
                        CATEGORY_SELECT, spec.base_url
                    )));
                }
            }
            self.settle().await;
        }

        page.find_element(SEARCH_BUTTON)
            .await
            .map_err(|e| CollectorError::ElementNotFound(format!("search button: {e}")))?
            .click()
            .await
            .map_err(|e| CollectorError::Navigation(format!("search click: {e}")))?;
        self.settle().await;

        self.debug_screenshot(&page, spec.label).await;
        info!("Period selected");
        Ok(())
    }

    /// Drives the export flow and renames the finished download to `target`.
    async fn export_spreadsheet(
        &self,
        kind: DocumentKind,
        target: &Path,
    ) -> Result<(), CollectorError> {
        let page = self.get_page()?.clone();
        let spec = kind.spec();
        info!("Exporting {} spreadsheet to {:?}...", spec.label, target);

        // The export group only renders over a non-empty grid, so a missing
        // button after a successful search means no records.
        let export_button = page.find_element(EXPORT_GROUP_BUTTON).await.map_err(|_| {
            CollectorError::NoData(format!(
                "empty {} grid for {}",
                spec.label,
                self.config.period()
            ))
        })?;
        export_button
            .click()
            .await
            .map_err(|e| CollectorError::Navigation(format!("export group click: {e}")))?;
        self.settle().await;

        page.find_element(XLS_OPTION)
            .await
            .map_err(|e| CollectorError::ElementNotFound(format!("xls option: {e}")))?
            .click()
            .await
            .map_err(|e| CollectorError::Navigation(format!("xls option click: {e}")))?;
        self.settle().await;

        // Listeners must exist before the confirm click or the completion
        // event can be missed. Browser.downloadProgress is a browser-domain
        // event; subscribing on both the page session and the browser handle
        // covers whichever one it is routed to.
        let page_events = page
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(|e| CollectorError::JavaScript(format!("download listener: {e}")))?;
        let browser_events = self
            .get_browser()?
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(|e| CollectorError::JavaScript(format!("download listener: {e}")))?;
        let mut events = futures::stream::select(page_events, browser_events);

        page.find_element(CONFIRM_DOWNLOAD)
            .await
            .map_err(|e| CollectorError::ElementNotFound(format!("confirm download: {e}")))?
            .click()
            .await
            .map_err(|e| CollectorError::Navigation(format!("confirm click: {e}")))?;
        self.settle().await;

        match wait_for_download(&mut events).await? {
            Some(guid) => {
                // AllowAndName stores the file under its guid.
                download::promote(&self.config.output_dir.join(&guid), target)?;
            }
            None => {
                warn!("No download completion event, falling back to newest-file selection");
                download::promote_newest(&self.config.output_dir, target)?;
            }
        }
        download::verify_exists(target)?;

        info!("Download complete: {:?}", target);
        Ok(())
    }

    async fn debug_screenshot(&self, page: &Page, label: &str) {
        if !self.config.debug {
            return;
        }
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(shot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&shot);
                debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
            }
            Err(e) => debug!("{} screenshot failed: {}", label, e),
        }
    }
}

#[async_trait]
impl Collector for PortalCollector {
    async fn initialize(&mut self) -> Result<(), CollectorError> {
        info!("Initializing browser...");

        std::fs::create_dir_all(&self.config.output_dir)?;
        // Downstream consumers get these paths on stdout, so resolve the
        // output directory to an absolute path once.
        self.config.output_dir = self.config.output_dir.canonicalize()?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--ignore-certificate-errors")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| CollectorError::BrowserInit(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CollectorError::BrowserInit(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CollectorError::BrowserInit(e.to_string()))?;

        // AllowAndName + events: files land in the output directory named by
        // guid and completion is observable via Browser.downloadProgress.
        let download_params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(self.config.output_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| CollectorError::BrowserInit(format!("download behavior: {e}")))?;
        page.execute(download_params)
            .await
            .map_err(|e| CollectorError::BrowserInit(format!("download behavior: {e}")))?;

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));

        info!("Browser initialized");
        Ok(())
    }

    async fn collect(&mut self, kind: DocumentKind) -> Result<PathBuf, CollectorError> {
        let target =
            kind.download_path(&self.config.output_dir, self.config.month, self.config.year);
        self.select_period(kind).await?;
        self.export_spreadsheet(kind, &target).await?;
        Ok(target)
    }

    async fn close(&mut self) -> Result<(), CollectorError> {
        info!("Closing browser...");
        self.page = None;
        self.browser = None;
        Ok(())
    }
}

/// Waits for a `Browser.downloadProgress` completion, returning the guid the
/// file was stored under. `None` means no event arrived inside the window
/// and the caller should fall back to mtime-based selection.
async fn wait_for_download(
    events: &mut (impl Stream<Item = Arc<EventDownloadProgress>> + Unpin),
) -> Result<Option<String>, CollectorError> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(DOWNLOAD_WAIT_SECS);
    loop {
        match tokio::time::timeout_at(deadline, events.next()).await {
            Ok(Some(event)) => match event.state {
                DownloadProgressState::Completed => {
                    info!("Download completed: guid={}", event.guid);
                    return Ok(Some(event.guid.clone()));
                }
                DownloadProgressState::Canceled => {
                    return Err(CollectorError::Download(format!(
                        "download canceled by browser (guid={})",
                        event.guid
                    )));
                }
                DownloadProgressState::InProgress => {
                    debug!(
                        "Download in progress: {}/{} bytes",
                        event.received_bytes, event.total_bytes
                    );
                }
            },
            Ok(None) => return Ok(None),
            Err(_) => {
                warn!(
                    "No download completion event within {}s",
                    DOWNLOAD_WAIT_SECS
                );
                return Ok(None);
            }
        }
    }
}

fn set_select_script(selector: &str, value: &str) -> String {
    format!(
        r#"
        (function() {{
            var el = document.querySelector('{selector}');
            if (!el) {{ return 'no-element'; }}
            var value = '{value}';
            var found = false;
            for (var i = 0; i < el.options.length; i++) {{
                if (el.options[i].value === value) {{ found = true; break; }}
            }}
            if (!found) {{ return 'no-option'; }}
            el.value = value;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }})()
        "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_collector_new() {
        let config = CollectorConfig::new(1, 2024);
        let collector = PortalCollector::new(config);
        assert!(collector.browser.is_none());
        assert!(collector.page.is_none());
    }

    #[test]
    fn test_set_select_script_embeds_selector_and_value() {
        let script = set_select_script(YEAR_SELECT, "01/2024##@@01/2024");
        assert!(script.contains("querySelector('#SC_data')"));
        assert!(script.contains("'01/2024##@@01/2024'"));
        assert!(script.contains("'no-option'"));
    }

    fn progress_event(state: &str, guid: &str) -> Arc<EventDownloadProgress> {
        let event = serde_json::from_value(serde_json::json!({
            "guid": guid,
            "totalBytes": 100.0,
            "receivedBytes": 100.0,
            "state": state,
        }))
        .unwrap();
        Arc::new(event)
    }

    #[tokio::test]
    async fn test_wait_for_download_returns_completed_guid() {
        let mut events = stream::iter(vec![
            progress_event("inProgress", "abc"),
            progress_event("completed", "abc"),
        ]);
        let guid = wait_for_download(&mut events).await.unwrap();
        assert_eq!(guid.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_wait_for_download_canceled_is_an_error() {
        let mut events = stream::iter(vec![progress_event("canceled", "abc")]);
        let err = wait_for_download(&mut events).await.unwrap_err();
        assert!(matches!(err, CollectorError::Download(_)));
    }

    #[tokio::test]
    async fn test_wait_for_download_sees_browser_side_events() {
        // Completion routed to the browser-level listener while the page
        // session stays silent must still resolve the guid.
        let page_events = stream::iter(Vec::<Arc<EventDownloadProgress>>::new());
        let browser_events = stream::iter(vec![progress_event("completed", "xyz")]);
        let mut events = stream::select(page_events, browser_events);
        let guid = wait_for_download(&mut events).await.unwrap();
        assert_eq!(guid.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_wait_for_download_ended_stream_falls_back() {
        let mut events = stream::iter(Vec::<Arc<EventDownloadProgress>>::new());
        assert!(wait_for_download(&mut events).await.unwrap().is_none());
    }
}
