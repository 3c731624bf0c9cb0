use std::io;
use thiserror::Error;

/// Error type for feed and pool operations.
#[derive(Error, Debug)]
pub enum FeedError {
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status code.
    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus {
        /// The HTTP status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The page did not carry the embedded metadata object.
    #[error("stream metadata not found in page")]
    MetadataNotFound,

    /// A required field was absent from the upstream response.
    #[error("missing field in upstream response: {0}")]
    MissingField(&'static str),

    /// The worker function panicked while processing an item.
    #[error("worker panicked on item {index}: {message}")]
    WorkerPanicked {
        /// Index of the input being processed.
        index: usize,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// No worker was available to process the item.
    #[error("no worker available to process item {0}")]
    WorkerUnavailable(usize),

    /// Every item of a batch failed.
    #[error("no content: every item failed")]
    NoContent,

    /// Some items of a batch failed.
    #[error("partial content: {failed} items failed")]
    PartialContent {
        /// Number of failed items.
        failed: usize,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FeedError {
    /// Returns true for the aggregate "every item failed" error.
    pub fn is_no_content(&self) -> bool {
        matches!(self, FeedError::NoContent)
    }

    /// Returns true for the aggregate "some items failed" error.
    pub fn is_partial_content(&self) -> bool {
        matches!(self, FeedError::PartialContent { .. })
    }
}

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
