//! Error handling types for repolink
//!
//! Every failure a definition call can end in maps onto one `BridgeError`
//! variant. Callers decide presentation (see `definition::provide_definition`).

use thiserror::Error;

/// Failure taxonomy of a single definition call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The document address could not be parsed into a repository address.
    #[error("Malformed address {address}: {reason}")]
    MalformedAddress { address: String, reason: String },

    /// A remote handle could not be acquired.
    #[error("Remote channel unavailable: {message}")]
    ChannelUnavailable { message: String },

    /// The remote call failed after the handle was acquired.
    #[error("Remote query failed: {message}")]
    RemoteQuery { message: String },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn malformed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::MalformedAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub fn channel_unavailable(message: impl Into<String>) -> Self {
        BridgeError::ChannelUnavailable {
            message: message.into(),
        }
    }

    pub fn remote_query(message: impl Into<String>) -> Self {
        BridgeError::RemoteQuery {
            message: message.into(),
        }
    }

    /// Remote-side failures degrade to "no answer" instead of a hard error.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::ChannelUnavailable { .. } | BridgeError::RemoteQuery { .. }
        )
    }
}
