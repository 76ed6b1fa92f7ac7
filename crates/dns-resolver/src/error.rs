use dns_types::protocol::types::{DomainNameError, UnsupportedRecordType};

/// Raised before any network I/O; the only error category that is returned
/// to the caller as an `Err` rather than folded into a normal `Result`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    UnsupportedRecordType(UnsupportedRecordType),
    InvalidName(DomainNameError),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationError::UnsupportedRecordType(err) => write!(f, "{err}"),
            ValidationError::InvalidName(err) => write!(f, "invalid domain name: {err}"),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::UnsupportedRecordType(err) => Some(err),
            ValidationError::InvalidName(err) => Some(err),
        }
    }
}

impl From<UnsupportedRecordType> for ValidationError {
    fn from(err: UnsupportedRecordType) -> Self {
        ValidationError::UnsupportedRecordType(err)
    }
}

impl From<DomainNameError> for ValidationError {
    fn from(err: DomainNameError) -> Self {
        ValidationError::InvalidName(err)
    }
}
