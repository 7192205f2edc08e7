// Error kinds shared by the token, HTTP and catalog layers. The flows and
// the UI stay on `anyhow` and wrap these with context where useful.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The token issuer could not be reached or returned an unparsable body.
    /// Fatal: there is no point retrying booking calls without tokens.
    #[error("token service unavailable: {0}")]
    TokenSourceUnavailable(String),

    /// A request hit the per-request timeout. Kept distinct from transport
    /// errors so callers never confuse a hang with a refused connection,
    /// and distinct from the 404 retry path (timeouts are not retried).
    #[error("request timed out")]
    Timeout,

    /// Any other transport-level failure (DNS, connection reset, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The upstream answered, but the body was not the JSON we expected.
    /// After the retry budget is spent this is how an error body surfaces.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Classify a reqwest error, keeping timeouts as their own kind.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }
}
