//! Error types for the Explorer client.
//!
//! # Design
//! Every failure surfaces as one `Error` value. Status classification happens
//! once, at the HTTP boundary (`http::check_status`), so callers can match on
//! `Authentication`, `Network` or `NotFound` without inspecting raw codes.
//! Anything unclassified lands in `Api` with the status and the server's
//! message. Nothing is retried or swallowed.

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `ExplorerClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server rejected the supplied token (or its absence) with 401 or 403.
    #[error("authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    /// The request never completed: connection refused, DNS failure, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The server returned 404 for the requested resource.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status.
    #[error("HTTP error {status}: {message}")]
    Api { status: u16, message: String },

    /// The server is still running the query; re-post with the token, or use
    /// `ExplorerClient::query_with_polling`.
    #[error("query still running (next_page_token {next_page_token})")]
    QueryPending { next_page_token: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// Input rejected locally before any request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Error::QueryPending { .. })
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}
