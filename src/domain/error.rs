use thiserror::Error;

/// Transport-level failures of the remote gateway.
///
/// Expected negative outcomes (unknown email on lookup, a rejected
/// verification code) are not errors; they are outcome values on the
/// gateway operations. These variants cover the cases where the backend
/// could not be reached or did not speak the documented contract.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("The server took too long to respond. Please try again.")]
    Timeout,

    #[error("Could not reach the server: {0}")]
    Network(String),

    #[error("The server returned an unexpected response: {0}")]
    Protocol(String),

    /// The backend answered in its documented JSON shape but reported a
    /// failure of its own, message passed through verbatim.
    #[error("{0}")]
    Server(String),
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("File exceeds the {limit_mb} MB size limit")]
    TooLarge { limit_mb: u32 },

    #[error("Unsupported file type: {0} (expected an image or PDF)")]
    UnsupportedType(String),
}
