//! Coletor de contracheques e verbas indenizatórias do MPAM.
//!
//! Drives a headless Chrome session against the MPAM transparency portal,
//! downloads the base-pay and indemnity spreadsheets for one month/year, and
//! renames them to the filenames the downstream parser expects.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coletor_mpam::{CollectRequest, CollectService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = CollectService::new();
//!
//!     let request = CollectRequest::new(1, 2024)
//!         .with_output_dir("/output")
//!         .with_headless(true);
//!
//!     let result = service.call(request).await.unwrap();
//!     for file in result.files {
//!         println!("{}", file.display());
//!     }
//! }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod portal;
pub mod service;
pub mod traits;

pub use config::CollectorConfig;
pub use error::CollectorError;
pub use portal::{DocumentKind, PortalCollector};
pub use service::{CollectRequest, CollectResult, CollectService};
pub use traits::Collector;
