use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::CollectorError;
use crate::portal::DocumentKind;

#[async_trait]
pub trait Collector: Send + Sync {
    /// Launches the browser session and prepares the output directory.
    async fn initialize(&mut self) -> Result<(), CollectorError>;

    /// Collects one spreadsheet, returning its renamed absolute path.
    async fn collect(&mut self, kind: DocumentKind) -> Result<PathBuf, CollectorError>;

    /// Releases the browser session.
    async fn close(&mut self) -> Result<(), CollectorError>;

    /// Full run: initialize, collect every document kind in order, close.
    /// Strictly sequential; the first failure aborts the whole run.
    async fn execute(&mut self) -> Result<Vec<PathBuf>, CollectorError> {
        self.initialize().await?;
        let mut files = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            files.push(self.collect(kind).await?);
        }
        self.close().await?;
        Ok(files)
    }
}
