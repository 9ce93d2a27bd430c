use thiserror::Error;

/// Exit codes consumed by the orchestration layer to decide retry policy.
pub const EXIT_INVALID_INPUT: i32 = 1;
pub const EXIT_CONNECTION: i32 = 2;
pub const EXIT_DATA_UNAVAILABLE: i32 = 4;
pub const EXIT_SYSTEM: i32 = 5;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("javascript error: {0}")]
    JavaScript(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("no data available: {0}")]
    NoData(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("file operation error: {0}")]
    FileIO(#[from] std::io::Error),
}

impl CollectorError {
    /// Maps the error to the exit status the downstream orchestrator expects.
    /// Classification happens once here; nothing exits mid-stack.
    pub fn exit_code(&self) -> i32 {
        match self {
            CollectorError::InvalidInput(_) => EXIT_INVALID_INPUT,
            CollectorError::BrowserInit(_)
            | CollectorError::Navigation(_)
            | CollectorError::JavaScript(_)
            | CollectorError::ElementNotFound(_)
            | CollectorError::Timeout(_) => EXIT_CONNECTION,
            CollectorError::NoData(_) => EXIT_DATA_UNAVAILABLE,
            CollectorError::Download(_) | CollectorError::FileIO(_) => EXIT_SYSTEM,
        }
    }
}
