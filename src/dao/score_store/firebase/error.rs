//! Error types shared by the Firebase storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`FirebaseDaoError`] failures.
pub type FirebaseResult<T> = Result<T, FirebaseDaoError>;

/// Failures that can occur while interacting with the Firebase REST API.
#[derive(Debug, Error)]
pub enum FirebaseDaoError {
    /// Required environment variable is missing.
    #[error("missing Firebase environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Firebase client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request to a database path could not be sent.
    #[error("failed to send Firebase request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Firebase returned an unexpected status code.
    #[error("unexpected Firebase response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode Firebase response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The event stream broke while reading it.
    #[error("Firebase event stream for `{path}` failed")]
    StreamRead {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server closed the event stream (`cancel` or `auth_revoked`).
    #[error("Firebase event stream for `{path}` closed by server: {event}")]
    StreamClosed { path: String, event: String },
}

impl From<FirebaseDaoError> for StorageError {
    fn from(err: FirebaseDaoError) -> Self {
        match err {
            FirebaseDaoError::StreamClosed { path, event } => StorageError::SubscriptionClosed {
                path,
                reason: event,
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
