//! Error types for ledgersync-http

use ledgersync_core::{CoreError, TransactionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    /// HTTP status, when the store answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            HttpError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Failure of a read: always a soft fetch error
    pub fn into_read_error(self, resource: &str) -> CoreError {
        CoreError::Fetch {
            resource: resource.to_string(),
            status: self.status(),
            message: self.to_string(),
        }
    }

    /// Failure of a write.
    ///
    /// A refusal from the store is a permission error. A 2xx with an
    /// unreadable body still counts as acknowledged. Only a write that never
    /// got an answer is a fetch error.
    pub fn into_write_error(self, id: Option<TransactionId>) -> CoreError {
        match self {
            HttpError::Status { .. } => CoreError::Permission {
                id,
                message: self.to_string(),
            },
            HttpError::Decode { .. } => CoreError::UnreadableAcknowledgment {
                id,
                message: self.to_string(),
            },
            other => other.into_read_error("write acknowledgment"),
        }
    }
}

pub type HttpResult<T> = Result<T, HttpError>;
