//! Error taxonomy for broker requests.
//!
//! Every variant is converted into a `Response` with a non-null `exception`;
//! none of them ever crosses the wire as a transport failure.

use crate::{ObjectId, RequestKind};

/// Errors that can occur while dispatching a request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrokerError {
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(ObjectId),

    #[error("Unknown request kind: {0}")]
    UnknownRequestKind(String),

    #[error("Invalid arguments for {kind}: {message}")]
    InvalidArguments { kind: RequestKind, message: String },

    #[error("{kind}: {message}")]
    HostInvocationFailure { kind: String, message: String },
}

impl BrokerError {
    /// Create an invalid arguments error
    pub fn invalid_arguments(kind: RequestKind, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            kind,
            message: message.into(),
        }
    }

    /// The class tag reported in a response's `exception` field.
    ///
    /// Host failures report the host's own error tag.
    pub fn exception_name(&self) -> &str {
        match self {
            BrokerError::UnknownIdentifier(_) => "UnknownIdentifier",
            BrokerError::UnknownRequestKind(_) => "UnknownRequestKind",
            BrokerError::InvalidArguments { .. } => "InvalidArguments",
            BrokerError::HostInvocationFailure { kind, .. } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_names() {
        let err = BrokerError::UnknownIdentifier(ObjectId::from("1"));
        assert_eq!(err.exception_name(), "UnknownIdentifier");

        let err = BrokerError::HostInvocationFailure {
            kind: "NoSuchAttribute".to_string(),
            message: "'demo.Person' object has no attribute 'x'".to_string(),
        };
        assert_eq!(err.exception_name(), "NoSuchAttribute");
        assert!(err.to_string().starts_with("NoSuchAttribute: "));
    }

    #[test]
    fn test_invalid_arguments_message() {
        let err = BrokerError::invalid_arguments(RequestKind::GetListItem, "missing index");
        assert_eq!(
            err.to_string(),
            "Invalid arguments for get_list_item: missing index"
        );
    }
}
