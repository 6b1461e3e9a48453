use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("candidate query failed: {0}")]
    Request(String),

    #[error("store not available yet: {0}")]
    NotReady(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Dependency,
}

#[derive(Debug, Error)]
pub enum GrepError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Dependency(#[from] SourceError),

    #[error("search cancelled before the candidate query completed")]
    Cancelled,
}

impl GrepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrepError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GrepError::Dependency(_) | GrepError::Cancelled => ErrorKind::Dependency,
        }
    }
}

pub type Result<T, E = GrepError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_reported_as_dependency_failure() {
        assert_eq!(GrepError::Cancelled.kind(), ErrorKind::Dependency);
        assert_eq!(
            GrepError::InvalidArgument("pattern".to_string()).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn dependency_error_displays_source_verbatim() {
        let error = GrepError::from(SourceError::Request("connection refused".to_string()));
        assert_eq!(error.to_string(), "candidate query failed: connection refused");
        assert_eq!(error.kind(), ErrorKind::Dependency);
    }
}
