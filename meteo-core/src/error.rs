use thiserror::Error;

use crate::client::RequestParams;

/// Errors surfaced to callers of the provider APIs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("timeout_error")]
    Timeout,

    /// The connectivity flag reported no network before the request was sent.
    #[error("no_network")]
    NoNetwork,

    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        request: Box<RequestParams>,
    },

    /// Upstream answered 2xx but the payload lacks what we need.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// A forecast payload carried no daily records to bucket hourly data into.
    #[error("forecast response contained no daily records")]
    EmptyForecast,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl RequestError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        RequestError::MalformedResponse(what.into())
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else {
            RequestError::Transport(err)
        }
    }
}
