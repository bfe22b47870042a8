//! Normalized, user presentable failures
//!
//! A [`Failure`] is the only error value that leaves the [request
//! executor](`crate::executor::RequestExecutor`). It carries a [`FailureKind`] from a closed set
//! and a title/message pair meant to be shown to a user as is.
use std::fmt;

use serde::{Deserialize, Serialize};

/// A list specifying categories of request failures
///
/// used with the [`Failure`] type. The set is closed, adding a kind is a breaking change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// A connection to the remote host could not be established in time
    ConnectionTimeout,
    /// The request could not be sent in time
    SendTimeout,
    /// The response was not received in time
    ReceiveTimeout,
    /// The remote host presented a certificate that could not be trusted
    BadCertificate,
    /// The server answered with an invalid or unexpected response
    BadResponse,
    /// The request was cancelled before it completed
    Cancelled,
    /// The connection failed or was dropped
    ConnectionError,
    /// Any other error, including errors that are not raised by the transport
    Unknown,
}

impl FailureKind {
    /// All failure kinds
    pub const ALL: [FailureKind; 8] = [
        FailureKind::ConnectionTimeout,
        FailureKind::SendTimeout,
        FailureKind::ReceiveTimeout,
        FailureKind::BadCertificate,
        FailureKind::BadResponse,
        FailureKind::Cancelled,
        FailureKind::ConnectionError,
        FailureKind::Unknown,
    ];

    /// Default short label for the kind
    pub fn title(&self) -> &'static str {
        use FailureKind::*;
        match *self {
            ConnectionTimeout => "Connection Timeout",
            SendTimeout => "Send Timeout",
            ReceiveTimeout => "Receive Timeout",
            BadCertificate => "Bad Certificate",
            BadResponse => "Bad Response",
            Cancelled => "Request Cancelled",
            ConnectionError => "Connection Error",
            Unknown => "Unknown Error",
        }
    }

    /// Default human-readable description for the kind
    pub fn message(&self) -> &'static str {
        use FailureKind::*;
        match *self {
            ConnectionTimeout => "Connection timed out.",
            SendTimeout => "Send request timed out.",
            ReceiveTimeout => "Receive response timed out.",
            BadCertificate => "Bad certificate received.",
            BadResponse => "Bad response received from server.",
            Cancelled => "Request was cancelled.",
            ConnectionError => "Connection error occurred.",
            Unknown => "Unknown error occurred.",
        }
    }
}

impl fmt::Display for FailureKind {
    /// Shows the default title of the `FailureKind`.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.title())
    }
}

impl From<FailureKind> for Failure {
    fn from(kind: FailureKind) -> Self {
        Failure::new(kind)
    }
}

/// A normalized request failure
///
/// Failures are immutable once created and never keep a reference to the error that
/// originated them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    kind: FailureKind,
    title: String,
    message: String,
}

impl Failure {
    /// Create a failure of the given kind using the default title and message
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            message: kind.message().to_string(),
        }
    }

    /// Create a failure of the given kind, replacing the default message
    ///
    /// An empty message is ignored and the default for the kind is used instead.
    pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::new(kind);
        }

        Self {
            kind,
            title: kind.title().to_string(),
            message,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for Failure {}

impl fmt::Display for Failure {
    /// Shows the human-readable message of the `Failure`.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.message)
    }
}
