use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::Service;
use tracing::info;

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::portal::PortalCollector;
use crate::traits::Collector;

/// One collection run: both spreadsheets for a single period.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub month: u32,
    pub year: u32,
    pub output_dir: PathBuf,
    pub general_timeout: Duration,
    pub time_between_steps: Duration,
    pub headless: bool,
}

impl CollectRequest {
    pub fn new(month: u32, year: u32) -> Self {
        let defaults = CollectorConfig::default();
        Self {
            month,
            year,
            output_dir: defaults.output_dir,
            general_timeout: defaults.general_timeout,
            time_between_steps: defaults.time_between_steps,
            headless: true,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl From<CollectorConfig> for CollectRequest {
    fn from(config: CollectorConfig) -> Self {
        Self {
            month: config.month,
            year: config.year,
            output_dir: config.output_dir,
            general_timeout: config.general_timeout,
            time_between_steps: config.time_between_steps,
            headless: config.headless,
        }
    }
}

impl From<CollectRequest> for CollectorConfig {
    fn from(req: CollectRequest) -> Self {
        CollectorConfig::new(req.month, req.year)
            .with_output_dir(req.output_dir)
            .with_general_timeout(req.general_timeout)
            .with_time_between_steps(req.time_between_steps)
            .with_headless(req.headless)
    }
}

/// Collection result: renamed absolute paths, in the order the downstream
/// parser expects them (contracheque first).
#[derive(Debug)]
pub struct CollectResult {
    pub files: Vec<PathBuf>,
}

/// tower::Service facade over [`PortalCollector`]. The whole run is bounded
/// by the request's general timeout; on expiry nothing is retried or
/// resumed.
#[derive(Debug, Clone, Default)]
pub struct CollectService {}

impl CollectService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<CollectRequest> for CollectService {
    type Response = CollectResult;
    type Error = CollectorError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CollectRequest) -> Self::Future {
        info!(
            "Collection request: period {:02}/{}, output {:?}",
            req.month, req.year, req.output_dir
        );

        Box::pin(async move {
            let general_timeout = req.general_timeout;
            let config: CollectorConfig = req.into();
            let mut collector = PortalCollector::new(config);

            let files = tokio::time::timeout(general_timeout, collector.execute())
                .await
                .map_err(|_| {
                    CollectorError::Timeout(format!(
                        "collection did not finish within {general_timeout:?}"
                    ))
                })??;

            info!("Collection finished: {} files", files.len());
            Ok(CollectResult { files })
        })
    }
}
