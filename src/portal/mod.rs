//! MPAM transparency-portal collector.
//!
//! Drives a fixed sequence of grid interactions (period select, optional
//! category filter, search, XLS export) per document kind and promotes the
//! resulting download to its parser-expected filename.

mod collector;
mod types;

pub use collector::PortalCollector;
pub use types::{period_select_value, DocumentKind, DocumentSpec, SelectOutcome};
