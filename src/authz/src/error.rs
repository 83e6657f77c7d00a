//! Error types for group resolution and access decisions

use thiserror::Error;

/// Authorization layer errors
///
/// Errors are `Clone` so a single failed load can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthzError {
    /// Entity does not exist in its store
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collection fetch failed
    ///
    /// Raised by store and directory implementations backed by a remote
    /// service. Cache loads pass it to every waiting caller unchanged.
    #[error("Load failed: {0}")]
    LoadFailure(String),

    /// Group or application store error
    #[error("Store error: {0}")]
    Store(String),

    /// Identity provider (connections, users) error
    ///
    /// Raised by [`ConnectionDirectory`](crate::store::ConnectionDirectory)
    /// and [`IdentityProvider`](crate::store::IdentityProvider)
    /// implementations that talk to a live provider; the bundled in-memory
    /// and snapshot stores never fail this way.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot or configuration could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Entity-not-found error for the given kind and id
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::NotFound(format!("{} '{}'", kind, id))
    }

    /// Returns true for [`AuthzError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<std::io::Error> for AuthzError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuthzError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AuthzError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::not_found("group", "g-1");
        assert_eq!(err.to_string(), "Not found: group 'g-1'");
        assert!(err.is_not_found());

        let err = AuthzError::LoadFailure("connection refused".to_string());
        assert_eq!(err.to_string(), "Load failed: connection refused");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: AuthzError = io.into();
        assert!(matches!(err, AuthzError::Io(msg) if msg.contains("missing.json")));
    }

    #[test]
    fn test_json_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuthzError = parse.into();
        assert!(matches!(err, AuthzError::Serialization(_)));
    }
}
