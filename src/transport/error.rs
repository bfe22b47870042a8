use std::fmt;

use thiserror::Error;

#[doc(hidden)]
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Categories of errors raised by a [Transport](`super::Transport`)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Establishing the connection took longer than allowed
    ConnectionTimeout,
    /// Sending the request took longer than allowed
    SendTimeout,
    /// Receiving the response took longer than allowed
    ReceiveTimeout,
    /// The server certificate was rejected
    BadCertificate,
    /// The server response was rejected, e.g. because of its status code
    BadResponse,
    /// The request was cancelled by the caller
    Cancelled,
    /// The connection could not be established or was dropped
    ConnectionError,
    /// Any other transport error
    Unknown,
}

impl TransportErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        use TransportErrorKind::*;
        match *self {
            ConnectionTimeout => "connection timeout",
            SendTimeout => "send timeout",
            ReceiveTimeout => "receive timeout",
            BadCertificate => "bad certificate",
            BadResponse => "bad response",
            Cancelled => "request cancelled",
            ConnectionError => "connection error",
            Unknown => "unknown transport error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status code {code})"))
        .unwrap_or_default()
}

/// An error raised by a transport while performing a request
///
/// The error may carry the HTTP status code of the response and the underlying error
/// for diagnostics. Neither is carried over when the error is classified into a
/// [Failure](`crate::failure::Failure`).
#[derive(Debug, Error)]
#[error("{kind}{}", status_suffix(.status))]
pub struct TransportError {
    kind: TransportErrorKind,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl From<TransportErrorKind> for TransportError {
    fn from(kind: TransportErrorKind) -> Self {
        TransportError::new(kind)
    }
}

impl TransportError {
    pub fn new(kind: TransportErrorKind) -> Self {
        Self {
            kind,
            status: None,
            source: None,
        }
    }

    /// Attach the status code of the response that caused the error
    pub fn with_status(self, status: u16) -> Self {
        let mut err = self;
        err.status = Some(status);
        err
    }

    /// Attach the underlying error
    pub fn with_source<E: Into<BoxError>>(self, source: E) -> Self {
        let mut err = self;
        err.source = Some(source.into());
        err
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}
