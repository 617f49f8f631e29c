use thiserror::Error;

/// Failure taxonomy for the market-data core.
///
/// Variants carry rendered strings rather than source errors so the enum is
/// `Clone`: a failed fetch is fanned out to every caller awaiting the same
/// in-flight request.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Connection failure or request timeout before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The remote API answered with a non-success HTTP status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// The cache persistence medium failed.
    #[error("cache store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
