use thiserror::Error;

/// Errors from model gateway calls.
///
/// Every variant is a gateway failure from the loop's point of view: it is
/// retried once and then ends the exchange as `ModelUnavailable`.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be turned into a decision.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
