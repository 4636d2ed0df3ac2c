use thiserror::Error;

/// Broad error kind used for user-facing handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// Transport/connectivity failure.
    Network,
    /// Malformed server payload, bad confirm code, missing required field.
    Validation,
    /// File exceeds the client-side upload cap.
    SizeLimit,
    /// Download of an unknown storage key.
    NotFound,
}

/// Normalized error surface shared by transport and reconciliation callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Fetch or transport failure.
    #[error("network error: {0}")]
    Network(String),
    /// Malformed server payload or rejected request input.
    #[error("invalid payload: {0}")]
    Validation(String),
    /// File exceeds the pre-flight upload cap.
    #[error("file is {actual} bytes, exceeding the {limit} byte upload cap")]
    SizeLimit { limit: u64, actual: u64 },
    /// No stored object for the requested key.
    #[error("no stored file for key '{0}'")]
    NotFound(String),
}

impl RelayError {
    pub fn kind(&self) -> RelayErrorKind {
        match self {
            Self::Network(_) => RelayErrorKind::Network,
            Self::Validation(_) => RelayErrorKind::Validation,
            Self::SizeLimit { .. } => RelayErrorKind::SizeLimit,
            Self::NotFound(_) => RelayErrorKind::NotFound,
        }
    }
}

/// Map non-2xx HTTP status codes to error kinds.
///
/// The backend reports a rejected confirm code or missing field as 400 and an
/// unknown download key as 404; everything else degrades to a transport-level
/// failure.
pub fn classify_http_status(status: u16) -> RelayErrorKind {
    match status {
        400 | 422 => RelayErrorKind::Validation,
        404 => RelayErrorKind::NotFound,
        _ => RelayErrorKind::Network,
    }
}
