//! Object Store Abstraction
//!
//! Trait-based abstraction over the S3-style capability set the inconsistency
//! layer consumes and re-exposes.
//!
//! Implementations:
//! - `InMemoryObjectStore`: strongly consistent reference backend for tests
//! - `InconsistentObjectStore`: fault-injecting decorator over any other store

use crate::clock::{ProductionClock, StoreClock};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompleteMultipartUploadResult,
    DeleteObjectRequest, DeleteObjectsRequest, DeleteObjectsResult, GetObjectResult,
    InitiateMultipartUploadRequest, InitiateMultipartUploadResult, ListMultipartUploadsRequest,
    ListObjectsRequest, ListObjectsV2Request, ListObjectsV2Result, MultipartUpload,
    MultipartUploadListing, ObjectListing, ObjectSummary, PutObjectRequest, PutObjectResult,
    UploadPartRequest, UploadPartResult,
};
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::ops::Bound;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every store operation
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Object store capability set
pub trait ObjectStore: Send + Sync + 'static {
    /// Put an object (create or overwrite)
    fn put_object<'a>(&'a self, request: PutObjectRequest) -> StoreFuture<'a, PutObjectResult>;

    /// Get an object's contents and attributes
    fn get_object<'a>(&'a self, bucket: &'a str, key: &'a str)
        -> StoreFuture<'a, GetObjectResult>;

    /// Delete a single object; deleting an absent key succeeds
    fn delete_object<'a>(&'a self, request: DeleteObjectRequest) -> StoreFuture<'a, ()>;

    /// Delete several objects in one call
    fn delete_objects<'a>(
        &'a self,
        request: DeleteObjectsRequest,
    ) -> StoreFuture<'a, DeleteObjectsResult>;

    /// Marker-paginated listing
    fn list_objects<'a>(&'a self, request: ListObjectsRequest) -> StoreFuture<'a, ObjectListing>;

    /// Token-paginated listing
    fn list_objects_v2<'a>(
        &'a self,
        request: ListObjectsV2Request,
    ) -> StoreFuture<'a, ListObjectsV2Result>;

    fn initiate_multipart_upload<'a>(
        &'a self,
        request: InitiateMultipartUploadRequest,
    ) -> StoreFuture<'a, InitiateMultipartUploadResult>;

    fn upload_part<'a>(&'a self, request: UploadPartRequest) -> StoreFuture<'a, UploadPartResult>;

    fn complete_multipart_upload<'a>(
        &'a self,
        request: CompleteMultipartUploadRequest,
    ) -> StoreFuture<'a, CompleteMultipartUploadResult>;

    fn abort_multipart_upload<'a>(
        &'a self,
        request: AbortMultipartUploadRequest,
    ) -> StoreFuture<'a, ()>;

    fn list_multipart_uploads<'a>(
        &'a self,
        request: ListMultipartUploadsRequest,
    ) -> StoreFuture<'a, MultipartUploadListing>;
}

// ============================================================================
// InMemoryObjectStore - For tests and simulation
// ============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified_ms: u64,
}

#[derive(Debug)]
struct PendingUpload {
    bucket: String,
    key: String,
    initiated_ms: u64,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    uploads: BTreeMap<String, PendingUpload>,
    next_upload_id: u64,
}

/// One page of a listing, before it is shaped into a v1 or v2 result
struct ListPage {
    summaries: Vec<ObjectSummary>,
    common_prefixes: Vec<String>,
    truncated: bool,
    /// Last key or common prefix returned, used to resume
    last_entry: Option<String>,
}

/// In-memory, strongly consistent object store
///
/// Buckets must be created before use. Clones share the same contents.
#[derive(Debug)]
pub struct InMemoryObjectStore<C: StoreClock = ProductionClock> {
    state: Arc<RwLock<InMemoryState>>,
    clock: C,
}

impl InMemoryObjectStore {
    /// Create a new in-memory store on the wall clock
    pub fn new() -> Self {
        Self::with_clock(ProductionClock::new())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: StoreClock> InMemoryObjectStore<C> {
    pub fn with_clock(clock: C) -> Self {
        InMemoryObjectStore {
            state: Arc::new(RwLock::new(InMemoryState::default())),
            clock,
        }
    }

    /// Create a bucket; creating an existing bucket is a no-op
    pub fn create_bucket(&self, bucket: &str) {
        self.state
            .write()
            .buckets
            .entry(bucket.to_string())
            .or_default();
    }

    /// Builder-style `create_bucket`
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.create_bucket(bucket);
        self
    }

    /// Number of objects in a bucket (0 for an unknown bucket)
    pub fn object_count(&self, bucket: &str) -> usize {
        self.state
            .read()
            .buckets
            .get(bucket)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().as_millis()
    }

    fn summary(bucket: &str, key: &str, obj: &StoredObject) -> ObjectSummary {
        ObjectSummary {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: obj.data.len() as u64,
            etag: obj.etag.clone(),
            last_modified_ms: obj.last_modified_ms,
            storage_class: "STANDARD".to_string(),
        }
    }

    fn store_object(&self, bucket: &str, key: &str, data: Bytes, etag: String) -> StoreResult<()> {
        let last_modified_ms = self.now_ms();
        let mut state = self.state.write();
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                etag,
                last_modified_ms,
            },
        );
        Ok(())
    }

    /// Walk keys in order from the exclusive start, rolling keys up into
    /// common prefixes when a delimiter is given. Prefixes count towards
    /// `max_keys`, as in S3.
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> StoreResult<ListPage> {
        let state = self.state.read();
        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let lower = match start_after {
            Some(start) if start >= prefix => Bound::Excluded(start.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };

        let mut page = ListPage {
            summaries: Vec::new(),
            common_prefixes: Vec::new(),
            truncated: false,
            last_entry: None,
        };
        let mut returned = 0usize;

        for (key, obj) in objects.range((lower, Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }

            let rolled_up = delimiter.filter(|d| !d.is_empty()).and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|idx| key[..prefix.len() + idx + d.len()].to_string())
            });

            if let Some(common) = &rolled_up {
                // Keys under the prefix we resumed from, or already reported
                if start_after == Some(common.as_str())
                    || page.common_prefixes.last() == Some(common)
                {
                    continue;
                }
            }

            if returned == max_keys {
                page.truncated = true;
                break;
            }
            returned += 1;

            match rolled_up {
                Some(common) => {
                    page.last_entry = Some(common.clone());
                    page.common_prefixes.push(common);
                }
                None => {
                    page.last_entry = Some(key.clone());
                    page.summaries.push(Self::summary(bucket, key, obj));
                }
            }
        }

        Ok(page)
    }
}

impl<C: StoreClock> Clone for InMemoryObjectStore<C> {
    fn clone(&self) -> Self {
        InMemoryObjectStore {
            state: Arc::clone(&self.state),
            clock: self.clock.clone(),
        }
    }
}

/// CRC32 of the content, hex encoded
fn content_etag(data: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(data))
}

impl<C: StoreClock> ObjectStore for InMemoryObjectStore<C> {
    fn put_object<'a>(&'a self, request: PutObjectRequest) -> StoreFuture<'a, PutObjectResult> {
        Box::pin(async move {
            let etag = content_etag(&request.data);
            self.store_object(&request.bucket, &request.key, request.data, etag.clone())?;
            Ok(PutObjectResult { etag })
        })
    }

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> StoreFuture<'a, GetObjectResult> {
        Box::pin(async move {
            let state = self.state.read();
            let objects = state
                .buckets
                .get(bucket)
                .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
            let obj = objects.get(key).ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
            Ok(GetObjectResult {
                summary: Self::summary(bucket, key, obj),
                data: obj.data.clone(),
            })
        })
    }

    fn delete_object<'a>(&'a self, request: DeleteObjectRequest) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            let objects = state
                .buckets
                .get_mut(&request.bucket)
                .ok_or_else(|| StoreError::NoSuchBucket(request.bucket.clone()))?;
            objects.remove(&request.key);
            Ok(())
        })
    }

    fn delete_objects<'a>(
        &'a self,
        request: DeleteObjectsRequest,
    ) -> StoreFuture<'a, DeleteObjectsResult> {
        Box::pin(async move {
            if request.keys.is_empty() {
                return Err(StoreError::InvalidRequest(
                    "batch delete requires at least one key".to_string(),
                ));
            }
            let mut state = self.state.write();
            let objects = state
                .buckets
                .get_mut(&request.bucket)
                .ok_or_else(|| StoreError::NoSuchBucket(request.bucket.clone()))?;
            for key in &request.keys {
                objects.remove(key);
            }
            Ok(DeleteObjectsResult {
                deleted: request.keys,
                errors: Vec::new(),
            })
        })
    }

    fn list_objects<'a>(&'a self, request: ListObjectsRequest) -> StoreFuture<'a, ObjectListing> {
        Box::pin(async move {
            let page = self.list_page(
                &request.bucket,
                &request.prefix,
                request.delimiter.as_deref(),
                request.marker.as_deref(),
                request.max_keys,
            )?;
            let next_marker = if page.truncated {
                page.last_entry
            } else {
                None
            };
            Ok(ObjectListing {
                bucket: request.bucket,
                prefix: request.prefix,
                delimiter: request.delimiter,
                marker: request.marker,
                next_marker,
                max_keys: request.max_keys,
                encoding_type: None,
                truncated: page.truncated,
                summaries: page.summaries,
                common_prefixes: page.common_prefixes,
            })
        })
    }

    fn list_objects_v2<'a>(
        &'a self,
        request: ListObjectsV2Request,
    ) -> StoreFuture<'a, ListObjectsV2Result> {
        Box::pin(async move {
            // The continuation token is the last entry of the previous page
            let start = request
                .continuation_token
                .as_deref()
                .or(request.start_after.as_deref());
            let page = self.list_page(
                &request.bucket,
                &request.prefix,
                request.delimiter.as_deref(),
                start,
                request.max_keys,
            )?;
            let next_continuation_token = if page.truncated {
                page.last_entry
            } else {
                None
            };
            Ok(ListObjectsV2Result {
                key_count: page.summaries.len() + page.common_prefixes.len(),
                bucket: request.bucket,
                prefix: request.prefix,
                delimiter: request.delimiter,
                start_after: request.start_after,
                continuation_token: request.continuation_token,
                next_continuation_token,
                max_keys: request.max_keys,
                encoding_type: None,
                truncated: page.truncated,
                summaries: page.summaries,
                common_prefixes: page.common_prefixes,
            })
        })
    }

    fn initiate_multipart_upload<'a>(
        &'a self,
        request: InitiateMultipartUploadRequest,
    ) -> StoreFuture<'a, InitiateMultipartUploadResult> {
        Box::pin(async move {
            let initiated_ms = self.now_ms();
            let mut state = self.state.write();
            if !state.buckets.contains_key(&request.bucket) {
                return Err(StoreError::NoSuchBucket(request.bucket));
            }
            state.next_upload_id += 1;
            let upload_id = format!("upload-{:08}", state.next_upload_id);
            state.uploads.insert(
                upload_id.clone(),
                PendingUpload {
                    bucket: request.bucket.clone(),
                    key: request.key.clone(),
                    initiated_ms,
                    parts: BTreeMap::new(),
                },
            );
            Ok(InitiateMultipartUploadResult {
                bucket: request.bucket,
                key: request.key,
                upload_id,
            })
        })
    }

    fn upload_part<'a>(&'a self, request: UploadPartRequest) -> StoreFuture<'a, UploadPartResult> {
        Box::pin(async move {
            if request.part_number == 0 {
                return Err(StoreError::InvalidPart {
                    upload_id: request.upload_id,
                    part_number: 0,
                });
            }
            let mut state = self.state.write();
            let upload = state
                .uploads
                .get_mut(&request.upload_id)
                .filter(|u| u.bucket == request.bucket && u.key == request.key)
                .ok_or_else(|| StoreError::NoSuchUpload(request.upload_id.clone()))?;
            let etag = content_etag(&request.data);
            upload
                .parts
                .insert(request.part_number, (etag.clone(), request.data));
            Ok(UploadPartResult {
                part_number: request.part_number,
                etag,
            })
        })
    }

    fn complete_multipart_upload<'a>(
        &'a self,
        request: CompleteMultipartUploadRequest,
    ) -> StoreFuture<'a, CompleteMultipartUploadResult> {
        Box::pin(async move {
            if request.parts.is_empty() {
                return Err(StoreError::InvalidRequest(
                    "multipart upload requires at least one part".to_string(),
                ));
            }
            if request
                .parts
                .windows(2)
                .any(|w| w[0].part_number >= w[1].part_number)
            {
                return Err(StoreError::InvalidRequest(
                    "parts must be listed in ascending order".to_string(),
                ));
            }

            let upload = {
                let mut state = self.state.write();
                let upload = state
                    .uploads
                    .get(&request.upload_id)
                    .filter(|u| u.bucket == request.bucket && u.key == request.key)
                    .ok_or_else(|| StoreError::NoSuchUpload(request.upload_id.clone()))?;
                for part in &request.parts {
                    match upload.parts.get(&part.part_number) {
                        Some((etag, _)) if *etag == part.etag => {}
                        _ => {
                            return Err(StoreError::InvalidPart {
                                upload_id: request.upload_id.clone(),
                                part_number: part.part_number,
                            })
                        }
                    }
                }
                state
                    .uploads
                    .remove(&request.upload_id)
                    .ok_or_else(|| StoreError::NoSuchUpload(request.upload_id.clone()))?
            };

            let mut data = BytesMut::new();
            for part in &request.parts {
                if let Some((_, bytes)) = upload.parts.get(&part.part_number) {
                    data.extend_from_slice(bytes);
                }
            }
            let data = data.freeze();
            let etag = format!("{}-{}", content_etag(&data), request.parts.len());
            self.store_object(&request.bucket, &request.key, data, etag.clone())?;

            Ok(CompleteMultipartUploadResult {
                bucket: request.bucket,
                key: request.key,
                etag,
            })
        })
    }

    fn abort_multipart_upload<'a>(
        &'a self,
        request: AbortMultipartUploadRequest,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            let matches = state
                .uploads
                .get(&request.upload_id)
                .is_some_and(|u| u.bucket == request.bucket && u.key == request.key);
            if !matches {
                return Err(StoreError::NoSuchUpload(request.upload_id));
            }
            state.uploads.remove(&request.upload_id);
            Ok(())
        })
    }

    fn list_multipart_uploads<'a>(
        &'a self,
        request: ListMultipartUploadsRequest,
    ) -> StoreFuture<'a, MultipartUploadListing> {
        Box::pin(async move {
            let state = self.state.read();
            if !state.buckets.contains_key(&request.bucket) {
                return Err(StoreError::NoSuchBucket(request.bucket));
            }
            let prefix = request.prefix.as_deref().unwrap_or("");
            let mut uploads: Vec<MultipartUpload> = state
                .uploads
                .iter()
                .filter(|(_, u)| u.bucket == request.bucket && u.key.starts_with(prefix))
                .map(|(id, u)| MultipartUpload {
                    key: u.key.clone(),
                    upload_id: id.clone(),
                    initiated_ms: u.initiated_ms,
                })
                .collect();
            uploads.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.upload_id.cmp(&b.upload_id)));
            Ok(MultipartUploadListing {
                bucket: request.bucket,
                prefix: request.prefix,
                uploads,
            })
        })
    }
}
