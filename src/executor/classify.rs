use crate::failure::{Failure, FailureKind};
use crate::transport::{TransportError, TransportErrorKind};

impl From<TransportErrorKind> for FailureKind {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::ConnectionTimeout => FailureKind::ConnectionTimeout,
            TransportErrorKind::SendTimeout => FailureKind::SendTimeout,
            TransportErrorKind::ReceiveTimeout => FailureKind::ReceiveTimeout,
            TransportErrorKind::BadCertificate => FailureKind::BadCertificate,
            TransportErrorKind::BadResponse => FailureKind::BadResponse,
            TransportErrorKind::Cancelled => FailureKind::Cancelled,
            TransportErrorKind::ConnectionError => FailureKind::ConnectionError,
            TransportErrorKind::Unknown => FailureKind::Unknown,
        }
    }
}

/// Classify a transport error, dropping its status code and source
impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::new(err.kind().into())
    }
}

/// Classify an error into a [`Failure`]
///
/// The cause chain of the error is searched for a [`TransportError`], whose kind decides the
/// failure kind. A [`Failure`] found in the chain keeps its kind. Any other error is
/// classified as [`FailureKind::Unknown`]. The failure always uses the default title and
/// message for its kind, a message override on a failure found in the chain is dropped.
pub fn classify(err: &anyhow::Error) -> Failure {
    for cause in err.chain() {
        if let Some(transport_err) = cause.downcast_ref::<TransportError>() {
            return Failure::new(transport_err.kind().into());
        }

        if let Some(failure) = cause.downcast_ref::<Failure>() {
            return Failure::new(failure.kind());
        }
    }

    Failure::new(FailureKind::Unknown)
}
