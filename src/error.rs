use thiserror::Error;

/// Fatal problems detected before any request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wordlist is empty")]
    EmptyWordlist,

    #[error("method set is empty")]
    EmptyMethods,

    #[error("concurrency must be between 1 and the semaphore permit limit (got {0})")]
    InvalidConcurrency(usize),

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
