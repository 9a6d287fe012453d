//! Request and result types for the object-store capability set.
//!
//! Shapes follow the S3 API: listings carry object summaries plus rolled-up
//! common prefixes, and every piece of paging metadata the caller may rely on.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Hierarchical delimiter; a listing that uses it is non-recursive
pub const DELIMITER: &str = "/";

/// Default page size, matching S3
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Attributes of a stored object as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: String,
    /// Last modification time (Unix ms)
    pub last_modified_ms: u64,
    pub storage_class: String,
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub data: Bytes,
}

impl PutObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        PutObjectRequest {
            bucket: bucket.into(),
            key: key.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectResult {
    pub etag: String,
}

#[derive(Debug, Clone)]
pub struct GetObjectResult {
    pub summary: ObjectSummary,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct DeleteObjectRequest {
    pub bucket: String,
    pub key: String,
}

impl DeleteObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        DeleteObjectRequest {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteObjectsRequest {
    pub bucket: String,
    pub keys: Vec<String>,
}

impl DeleteObjectsRequest {
    pub fn new<I, K>(bucket: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        DeleteObjectsRequest {
            bucket: bucket.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-key failure inside a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteError {
    pub key: String,
    pub code: String,
    pub message: String,
}

/// Outcome of a batch delete; a batch can partially succeed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectsResult {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteError>,
}

/// Marker-paginated listing request (S3 ListObjects v1)
#[derive(Debug, Clone)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    /// Exclusive start key
    pub marker: Option<String>,
    pub max_keys: usize,
}

impl ListObjectsRequest {
    /// Flat listing of everything under `prefix`
    pub fn recursive(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        ListObjectsRequest {
            bucket: bucket.into(),
            prefix: prefix.into(),
            delimiter: None,
            marker: None,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }

    /// Directory-style listing, rolling deeper keys up into common prefixes
    pub fn delimited(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        ListObjectsRequest {
            delimiter: Some(DELIMITER.to_string()),
            ..Self::recursive(bucket, prefix)
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Recursive unless the hierarchical delimiter is in use
    pub fn is_recursive(&self) -> bool {
        is_recursive(self.delimiter.as_deref())
    }
}

/// Marker-paginated listing result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub marker: Option<String>,
    pub next_marker: Option<String>,
    pub max_keys: usize,
    pub encoding_type: Option<String>,
    pub truncated: bool,
    pub summaries: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
}

/// Token-paginated listing request (S3 ListObjectsV2)
#[derive(Debug, Clone)]
pub struct ListObjectsV2Request {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
    pub start_after: Option<String>,
    pub max_keys: usize,
}

impl ListObjectsV2Request {
    pub fn recursive(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        ListObjectsV2Request {
            bucket: bucket.into(),
            prefix: prefix.into(),
            delimiter: None,
            continuation_token: None,
            start_after: None,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }

    pub fn delimited(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        ListObjectsV2Request {
            delimiter: Some(DELIMITER.to_string()),
            ..Self::recursive(bucket, prefix)
        }
    }

    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn is_recursive(&self) -> bool {
        is_recursive(self.delimiter.as_deref())
    }
}

/// Token-paginated listing result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsV2Result {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
    pub next_continuation_token: Option<String>,
    pub max_keys: usize,
    pub key_count: usize,
    pub encoding_type: Option<String>,
    pub truncated: bool,
    pub summaries: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InitiateMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
}

impl InitiateMultipartUploadRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        InitiateMultipartUploadRequest {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Clone)]
pub struct UploadPartRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    /// 1-based, as in S3
    pub part_number: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPartResult {
    pub part_number: u32,
    pub etag: String,
}

/// Part reference passed back when completing an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartETag {
    pub part_number: u32,
    pub etag: String,
}

impl From<UploadPartResult> for PartETag {
    fn from(result: UploadPartResult) -> Self {
        PartETag {
            part_number: result.part_number,
            etag: result.etag,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<PartETag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub etag: String,
}

#[derive(Debug, Clone)]
pub struct AbortMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Clone)]
pub struct ListMultipartUploadsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
}

impl ListMultipartUploadsRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        ListMultipartUploadsRequest {
            bucket: bucket.into(),
            prefix: None,
        }
    }
}

/// An upload that has been initiated but neither completed nor aborted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUpload {
    pub key: String,
    pub upload_id: String,
    pub initiated_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartUploadListing {
    pub bucket: String,
    pub prefix: Option<String>,
    pub uploads: Vec<MultipartUpload>,
}

fn is_recursive(delimiter: Option<&str>) -> bool {
    delimiter != Some(DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_inferred_from_delimiter() {
        assert!(ListObjectsRequest::recursive("b", "a/").is_recursive());
        assert!(!ListObjectsRequest::delimited("b", "a/").is_recursive());
        assert!(ListObjectsV2Request::recursive("b", "a/").is_recursive());
        assert!(!ListObjectsV2Request::delimited("b", "a/").is_recursive());

        // Any delimiter other than "/" does not produce a directory view
        let mut odd = ListObjectsRequest::recursive("b", "a/");
        odd.delimiter = Some("|".to_string());
        assert!(odd.is_recursive());
    }
}
