/// Errors from the remote transform services.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Remote service error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body, preserved verbatim.
        body: String,
    },

    /// The service answered successfully but returned no image.
    #[error("Remote service returned no image")]
    EmptyResponse,

    /// A local stand-in failed (mocks, encoding of test fixtures).
    #[error("{0}")]
    Other(String),
}
