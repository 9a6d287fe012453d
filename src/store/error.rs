//! Object store errors.
//!
//! Two families share one type: the injected `Throttled` failure raised by the
//! inconsistency layer before any delegate call, and the failures of the
//! underlying store, which pass through the decorator unchanged.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Simulated transient throttling; callers are expected to retry
    #[error("throttled count = {failure_count}")]
    Throttled { failure_count: u64 },

    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("no such upload: {0}")]
    NoSuchUpload(String),

    #[error("invalid part {part_number} for upload {upload_id}")]
    InvalidPart { upload_id: String, part_number: u32 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// HTTP status the equivalent S3 response would carry
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Throttled { .. } => 503,
            StoreError::NoSuchBucket(_)
            | StoreError::NoSuchKey { .. }
            | StoreError::NoSuchUpload(_) => 404,
            StoreError::InvalidPart { .. } | StoreError::InvalidRequest(_) => 400,
            StoreError::Io(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Throttled { .. } | StoreError::Io(_))
    }

    /// True only for failures raised by fault injection
    pub fn is_injected(&self) -> bool {
        matches!(self, StoreError::Throttled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttled_is_retryable_503() {
        let err = StoreError::Throttled { failure_count: 3 };
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(err.is_injected());
        assert_eq!(err.to_string(), "throttled count = 3");
    }

    #[test]
    fn test_store_failures_are_not_injected() {
        let err = StoreError::NoSuchKey {
            bucket: "b".to_string(),
            key: "k".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_retryable());
        assert!(!err.is_injected());
        assert_eq!(err.to_string(), "no such key: b/k");
    }
}
