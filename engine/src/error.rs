//! Error types for the Tote engine.

use crate::{ItemId, UserId};
use thiserror::Error;

/// All possible errors from the Tote engine.
///
/// Nothing here is fatal: every variant means "the operation did not take
/// effect and the previous state is preserved".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("document not found for user: {0}")]
    DocumentNotFound(UserId),

    // Storage errors
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("local storage failure: {0}")]
    Storage(String),

    /// A read was served from the local mirror because the remote store
    /// could not be reached.
    #[error("sync failure: {0}")]
    SyncFailure(String),

    // Session errors
    #[error("identity provider closed before a session was published")]
    IdentityClosed,

    #[error("this action requires a signed-in user")]
    LoginRequired,

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the error came from talking to the remote store.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::SyncFailure(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedData(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::ItemNotFound("p1".into());
        assert_eq!(err.to_string(), "item not found: p1");

        let err = Error::Transport("connection reset".into());
        assert_eq!(err.to_string(), "transport failure: connection reset");

        let err = Error::DocumentNotFound("u1".into());
        assert_eq!(err.to_string(), "document not found for user: u1");
    }

    #[test]
    fn transport_classification() {
        assert!(Error::Transport("x".into()).is_transport());
        assert!(Error::SyncFailure("x".into()).is_transport());
        assert!(!Error::ItemNotFound("x".into()).is_transport());
        assert!(!Error::MalformedData("x".into()).is_transport());
    }

    #[test]
    fn json_errors_are_malformed_data() {
        let err: Error = serde_json::from_str::<Vec<u32>>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::MalformedData(_)));
    }
}
