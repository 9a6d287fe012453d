//! Object storage capability set
//!
//! The request/result model, the `ObjectStore` trait every backend and
//! decorator implements, and a strongly consistent in-memory backend.

pub mod error;
pub mod object_store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use object_store::{InMemoryObjectStore, ObjectStore, StoreFuture};
pub use types::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompleteMultipartUploadResult,
    DeleteError, DeleteObjectRequest, DeleteObjectsRequest, DeleteObjectsResult, GetObjectResult,
    InitiateMultipartUploadRequest, InitiateMultipartUploadResult, ListMultipartUploadsRequest,
    ListObjectsRequest, ListObjectsV2Request, ListObjectsV2Result, MultipartUpload,
    MultipartUploadListing, ObjectListing, ObjectSummary, PartETag, PutObjectRequest,
    PutObjectResult, UploadPartRequest, UploadPartResult, DEFAULT_MAX_KEYS, DELIMITER,
};
