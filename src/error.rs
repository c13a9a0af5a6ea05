// src/error.rs
use thiserror::Error;

use crate::fetch::Target;

/// Failure of a single page acquisition (one attempt, or the retry loop as a whole).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("{target} page not ready after {waited_ms} ms: {detail}")]
    NotReady { target: Target, waited_ms: u128, detail: String },

    #[error("selector error: {0}")]
    Selector(String),

    #[error("browser error: {0}")]
    Browser(String),

    /// The CDP connection to the browser dropped or stopped answering.
    #[error("browser connection lost: {0}")]
    Session(String),

    #[error("{target} fetch failed after {attempts} attempts: {last}")]
    Exhausted { target: Target, attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Navigation { .. }
            | FetchError::Transport(_)
            | FetchError::NotReady { .. }
            | FetchError::Session(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Selector(_)
            | FetchError::Browser(_)
            | FetchError::Exhausted { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
            _ => FetchError::Transport(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected store response: {0}")]
    Response(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("refusing to publish an invalid batch ({0} errors)")]
    InvalidBatch(usize),

    #[error("bulk write failed: {0}")]
    Bulk(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("alias table: {0}")]
    Alias(String),

    #[error("browser mode requested but this build lacks the `browser` feature")]
    BrowserUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Umbrella error for a whole run / binary entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
