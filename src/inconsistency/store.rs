//! Fault-injecting object store decorator.
//!
//! Per call:
//! - put: throttle check, delegate, then maybe register a delayed put
//! - delete (single or batch): throttle check, capture each delay-selected
//!   key's summary through an unthrottled listing, delegate, then register the
//!   keys the store actually deleted
//! - list (v1 or v2): throttle check, delegate, transform the raw listing;
//!   paging metadata is passed through untouched
//! - multipart lifecycle: throttle check only
//! - get and abort: pass-through

use super::config::{ConfigError, InconsistencyConfig};
use super::failure::FailureInjector;
use super::listing::{ListingTransformer, TransformedListing};
use super::state::ConsistencyState;
use crate::clock::{ProductionClock, StoreClock};
use crate::io::{ProductionRng, Rng};
use crate::store::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompleteMultipartUploadResult,
    DeleteObjectRequest, DeleteObjectsRequest, DeleteObjectsResult, GetObjectResult,
    InitiateMultipartUploadRequest, InitiateMultipartUploadResult, ListMultipartUploadsRequest,
    ListObjectsRequest, ListObjectsV2Request, ListObjectsV2Result, MultipartUploadListing,
    ObjectListing, ObjectStore, ObjectSummary, PutObjectRequest, PutObjectResult, StoreFuture,
    StoreResult, UploadPartRequest, UploadPartResult,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Counters for what the decorator has injected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InconsistencyStats {
    /// Calls that went through the throttle check
    pub operations: u64,
    pub throttled: u64,
    pub delayed_puts: u64,
    pub delayed_deletes: u64,
    pub listings: u64,
    pub hidden_entries: u64,
    pub restored_summaries: u64,
    pub restored_prefixes: u64,
}

/// Object store wrapper that delays listing visibility and injects throttles
pub struct InconsistentObjectStore<
    S: ObjectStore,
    R: Rng = ProductionRng,
    C: StoreClock = ProductionClock,
> {
    inner: S,
    failures: FailureInjector<R>,
    state: ConsistencyState<R, C>,
    stats: Mutex<InconsistencyStats>,
}

impl<S: ObjectStore> InconsistentObjectStore<S> {
    /// Wrap `inner` with an entropy-seeded RNG and the wall clock
    pub fn new(inner: S, config: InconsistencyConfig) -> Result<Self, ConfigError> {
        Self::with_parts(inner, config, ProductionRng::new(), ProductionClock::new())
    }
}

impl<S: ObjectStore, R: Rng, C: StoreClock> InconsistentObjectStore<S, R, C> {
    /// Wrap `inner` with an explicit RNG and clock (seeded runs, virtual time)
    pub fn with_parts(
        inner: S,
        config: InconsistencyConfig,
        rng: R,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let rng = Arc::new(Mutex::new(rng));
        let failures = FailureInjector::new(
            Arc::clone(&rng),
            config.throttle_probability,
            config.failure_limit,
        )?;
        let state = ConsistencyState::new(&config, rng, clock);

        let store = InconsistentObjectStore {
            inner,
            failures,
            state,
            stats: Mutex::new(InconsistencyStats::default()),
        };
        info!("{}", store);
        Ok(store)
    }

    /// Drop all pending delays. Listings behave normally until new keys are
    /// delayed by later puts or deletes.
    pub fn clear_inconsistency(&self) {
        info!("clearing all delayed puts / deletes");
        self.state.clear();
    }

    /// Replace the failure budget (0 = no limit) and reset the failure count
    pub fn set_failure_limit(&self, limit: u64) {
        self.failures.set_failure_limit(limit);
    }

    pub fn failure_limit(&self) -> u64 {
        self.failures.failure_limit()
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.failure_count()
    }

    pub fn throttle_probability(&self) -> f64 {
        self.failures.throttle_probability()
    }

    pub fn set_throttle_probability(&self, probability: f64) -> Result<(), ConfigError> {
        self.failures.set_throttle_probability(probability)
    }

    pub fn delay_key_probability(&self) -> f64 {
        self.state.delay_key_probability()
    }

    pub fn delay_key_msec(&self) -> u64 {
        self.state.delay_window().as_millis() as u64
    }

    pub fn delay_window(&self) -> Duration {
        self.state.delay_window()
    }

    pub fn stats(&self) -> InconsistencyStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = InconsistencyStats::default();
    }

    /// Delay state, for inspection in tests
    pub fn state(&self) -> &ConsistencyState<R, C> {
        &self.state
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Throttle check that runs first on every decorated call
    fn maybe_fail(&self, operation: &'static str) -> StoreResult<()> {
        self.stats.lock().operations += 1;
        let result = self.failures.maybe_fail(operation);
        if result.is_err() {
            self.stats.lock().throttled += 1;
        }
        result
    }

    fn transform(
        &self,
        summaries: Vec<ObjectSummary>,
        common_prefixes: Vec<String>,
        prefix: &str,
        recursive: bool,
    ) -> TransformedListing {
        let out = ListingTransformer::new(&self.state).transform(
            summaries,
            common_prefixes,
            prefix,
            recursive,
        );
        let mut stats = self.stats.lock();
        stats.listings += 1;
        stats.hidden_entries += out.hidden as u64;
        stats.restored_summaries += out.restored_summaries as u64;
        stats.restored_prefixes += out.restored_prefixes as u64;
        out
    }

    /// Listing without the throttle check
    async fn inner_list_objects(&self, request: ListObjectsRequest) -> StoreResult<ObjectListing> {
        debug!("list prefix {}", request.prefix);
        let prefix = request.prefix.clone();
        let recursive = request.is_recursive();
        let raw = self.inner.list_objects(request).await?;
        let out = self.transform(raw.summaries, raw.common_prefixes, &prefix, recursive);
        Ok(ObjectListing {
            summaries: out.summaries,
            common_prefixes: out.common_prefixes,
            ..raw
        })
    }

    async fn inner_list_objects_v2(
        &self,
        request: ListObjectsV2Request,
    ) -> StoreResult<ListObjectsV2Result> {
        debug!("list v2 prefix {}", request.prefix);
        let prefix = request.prefix.clone();
        let recursive = request.is_recursive();
        let raw = self.inner.list_objects_v2(request).await?;
        let out = self.transform(raw.summaries, raw.common_prefixes, &prefix, recursive);
        Ok(ListObjectsV2Result {
            summaries: out.summaries,
            common_prefixes: out.common_prefixes,
            ..raw
        })
    }

    /// Last known summary of `key`, as the (transformed) listing reports it
    async fn capture_summary(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectSummary>> {
        let listing = self
            .inner_list_objects(ListObjectsRequest::recursive(bucket, key))
            .await?;
        Ok(listing.summaries.into_iter().find(|s| s.key == key))
    }

    fn record_delete(&self, key: &str, summary: Option<ObjectSummary>) {
        self.state.record_delete(key, summary);
        self.stats.lock().delayed_deletes += 1;
    }
}

impl<S: ObjectStore, R: Rng, C: StoreClock> std::fmt::Display
    for InconsistentObjectStore<S, R, C>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Inconsistent object store with {} msec delay, substring {:?}, delay probability {}; \
             throttle probability {}; failure limit {}, failure count {}",
            self.delay_key_msec(),
            self.state.delay_key_substring(),
            self.delay_key_probability(),
            self.throttle_probability(),
            self.failure_limit(),
            self.failure_count()
        )
    }
}

impl<S: ObjectStore, R: Rng, C: StoreClock> ObjectStore for InconsistentObjectStore<S, R, C> {
    fn put_object<'a>(&'a self, request: PutObjectRequest) -> StoreFuture<'a, PutObjectResult> {
        Box::pin(async move {
            debug!("put key {}", request.key);
            self.maybe_fail("put_object")?;
            let key = request.key.clone();
            let result = self.inner.put_object(request).await?;
            if self.state.register_put(&key) {
                self.stats.lock().delayed_puts += 1;
            }
            Ok(result)
        })
    }

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> StoreFuture<'a, GetObjectResult> {
        self.inner.get_object(bucket, key)
    }

    fn delete_object<'a>(&'a self, request: DeleteObjectRequest) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            debug!("delete key {}", request.key);
            self.maybe_fail("delete_object")?;
            let delayed = self.state.should_delay(&request.key);
            let summary = if delayed {
                self.capture_summary(&request.bucket, &request.key).await?
            } else {
                None
            };
            let key = request.key.clone();
            self.inner.delete_object(request).await?;
            if delayed {
                self.record_delete(&key, summary);
            }
            Ok(())
        })
    }

    fn delete_objects<'a>(
        &'a self,
        request: DeleteObjectsRequest,
    ) -> StoreFuture<'a, DeleteObjectsResult> {
        Box::pin(async move {
            self.maybe_fail("delete_objects")?;
            let mut pending = Vec::new();
            for key in &request.keys {
                if self.state.should_delay(key) {
                    let summary = self.capture_summary(&request.bucket, key).await?;
                    pending.push((key.clone(), summary));
                }
            }

            let result = self.inner.delete_objects(request).await?;

            let deleted: HashSet<&str> = result.deleted.iter().map(String::as_str).collect();
            for (key, summary) in pending {
                if deleted.contains(key.as_str()) {
                    self.record_delete(&key, summary);
                }
            }
            Ok(result)
        })
    }

    fn list_objects<'a>(&'a self, request: ListObjectsRequest) -> StoreFuture<'a, ObjectListing> {
        Box::pin(async move {
            self.maybe_fail("list_objects")?;
            self.inner_list_objects(request).await
        })
    }

    fn list_objects_v2<'a>(
        &'a self,
        request: ListObjectsV2Request,
    ) -> StoreFuture<'a, ListObjectsV2Result> {
        Box::pin(async move {
            self.maybe_fail("list_objects_v2")?;
            self.inner_list_objects_v2(request).await
        })
    }

    fn initiate_multipart_upload<'a>(
        &'a self,
        request: InitiateMultipartUploadRequest,
    ) -> StoreFuture<'a, InitiateMultipartUploadResult> {
        Box::pin(async move {
            self.maybe_fail("initiate_multipart_upload")?;
            self.inner.initiate_multipart_upload(request).await
        })
    }

    fn upload_part<'a>(&'a self, request: UploadPartRequest) -> StoreFuture<'a, UploadPartResult> {
        Box::pin(async move {
            self.maybe_fail("upload_part")?;
            self.inner.upload_part(request).await
        })
    }

    fn complete_multipart_upload<'a>(
        &'a self,
        request: CompleteMultipartUploadRequest,
    ) -> StoreFuture<'a, CompleteMultipartUploadResult> {
        Box::pin(async move {
            self.maybe_fail("complete_multipart_upload")?;
            self.inner.complete_multipart_upload(request).await
        })
    }

    fn abort_multipart_upload<'a>(
        &'a self,
        request: AbortMultipartUploadRequest,
    ) -> StoreFuture<'a, ()> {
        self.inner.abort_multipart_upload(request)
    }

    fn list_multipart_uploads<'a>(
        &'a self,
        request: ListMultipartUploadsRequest,
    ) -> StoreFuture<'a, MultipartUploadListing> {
        Box::pin(async move {
            self.maybe_fail("list_multipart_uploads")?;
            self.inner.list_multipart_uploads(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::io::SimulatedRng;
    use crate::store::{InMemoryObjectStore, StoreError};
    use bytes::Bytes;

    const BUCKET: &str = "bucket";
    const WINDOW_MS: u64 = 5_000;

    type TestStore =
        InconsistentObjectStore<InMemoryObjectStore<SimulatedClock>, SimulatedRng, SimulatedClock>;

    fn setup(config: InconsistencyConfig) -> (TestStore, SimulatedClock) {
        let clock = SimulatedClock::new(1_000_000);
        let inner = InMemoryObjectStore::with_clock(clock.clone()).with_bucket(BUCKET);
        let store =
            InconsistentObjectStore::with_parts(inner, config, SimulatedRng::new(42), clock.clone())
                .unwrap();
        (store, clock)
    }

    fn delay_all() -> (TestStore, SimulatedClock) {
        setup(InconsistencyConfig::delay_all(Duration::from_millis(WINDOW_MS)))
    }

    async fn put(store: &TestStore, key: &str) {
        store
            .put_object(PutObjectRequest::new(BUCKET, key, Bytes::from(key.to_string())))
            .await
            .unwrap();
    }

    async fn flat_keys(store: &TestStore, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = store
            .list_objects(ListObjectsRequest::recursive(BUCKET, prefix))
            .await
            .unwrap()
            .summaries
            .into_iter()
            .map(|s| s.key)
            .collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_delayed_put_hidden_then_visible() {
        let (store, clock) = delay_all();

        put(&store, "dir/file").await;
        assert!(flat_keys(&store, "dir/").await.is_empty());

        // GET is not affected by listing delays
        assert!(store.get_object(BUCKET, "dir/file").await.is_ok());

        clock.advance_ms(WINDOW_MS);
        assert_eq!(flat_keys(&store, "dir/").await, vec!["dir/file"]);

        let stats = store.stats();
        assert_eq!(stats.delayed_puts, 1);
        assert_eq!(stats.hidden_entries, 1);
    }

    #[tokio::test]
    async fn test_only_matching_keys_delayed() {
        let (store, _) = setup(InconsistencyConfig {
            delay_key_substring: "DELAY_LISTING_ME".to_string(),
            delay_key_msec: WINDOW_MS,
            ..Default::default()
        });

        put(&store, "t/DELAY_LISTING_ME/a").await;
        put(&store, "t/plain").await;

        assert_eq!(flat_keys(&store, "t/").await, vec!["t/plain"]);
    }

    #[tokio::test]
    async fn test_deleted_object_stays_listed_with_summary() {
        let (store, clock) = delay_all();

        put(&store, "d/file").await;
        clock.advance_ms(WINDOW_MS);
        let before = store
            .list_objects(ListObjectsRequest::recursive(BUCKET, "d/"))
            .await
            .unwrap();
        assert_eq!(before.summaries.len(), 1);

        store
            .delete_object(DeleteObjectRequest::new(BUCKET, "d/file"))
            .await
            .unwrap();
        assert_eq!(store.inner().object_count(BUCKET), 0);

        let during = store
            .list_objects(ListObjectsRequest::recursive(BUCKET, "d/"))
            .await
            .unwrap();
        assert_eq!(during.summaries, before.summaries);

        clock.advance_ms(WINDOW_MS);
        assert!(flat_keys(&store, "d/").await.is_empty());
        assert_eq!(store.state().pending_deletes(), 0);
    }

    #[tokio::test]
    async fn test_delete_of_hidden_put_captures_no_summary() {
        let (store, _) = delay_all();

        // Still inside the put window, so the capture listing cannot see it
        put(&store, "h/file").await;
        store
            .delete_object(DeleteObjectRequest::new(BUCKET, "h/file"))
            .await
            .unwrap();

        assert!(flat_keys(&store, "h/").await.is_empty());
        let listing = store
            .list_objects(ListObjectsRequest::delimited(BUCKET, "h/"))
            .await
            .unwrap();
        assert!(listing.summaries.is_empty());
        assert!(listing.common_prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_directory_delete_rolls_up() {
        let (store, clock) = delay_all();

        store
            .delete_object(DeleteObjectRequest::new(BUCKET, "a/b/c/d/e/file"))
            .await
            .unwrap();

        let delimited = store
            .list_objects(ListObjectsRequest::delimited(BUCKET, "a/b/c/"))
            .await
            .unwrap();
        assert!(delimited.summaries.is_empty());
        assert_eq!(delimited.common_prefixes, vec!["a/b/c/d/"]);

        // Nothing existed, so no summary was captured for the flat view
        assert!(flat_keys(&store, "a/b/c/").await.is_empty());

        clock.advance_ms(WINDOW_MS);
        let delimited = store
            .list_objects(ListObjectsRequest::delimited(BUCKET, "a/b/c/"))
            .await
            .unwrap();
        assert!(delimited.common_prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_registers_each_key() {
        let (store, clock) = delay_all();

        for key in ["m/1", "m/2", "m/3"] {
            put(&store, key).await;
        }
        clock.advance_ms(WINDOW_MS);

        let result = store
            .delete_objects(DeleteObjectsRequest::new(BUCKET, ["m/1", "m/3"]))
            .await
            .unwrap();
        assert_eq!(result.deleted.len(), 2);
        assert_eq!(store.inner().object_count(BUCKET), 1);

        assert_eq!(flat_keys(&store, "m/").await, vec!["m/1", "m/2", "m/3"]);
        assert_eq!(store.stats().delayed_deletes, 2);

        clock.advance_ms(WINDOW_MS);
        assert_eq!(flat_keys(&store, "m/").await, vec!["m/2"]);
    }

    #[tokio::test]
    async fn test_v2_listing_preserves_metadata() {
        let (store, clock) = delay_all();

        for i in 0..3 {
            put(&store, &format!("v/{}", i)).await;
        }
        clock.advance_ms(WINDOW_MS);
        put(&store, "v/9").await;

        let raw = store
            .inner()
            .list_objects_v2(ListObjectsV2Request::recursive(BUCKET, "v/").with_max_keys(2))
            .await
            .unwrap();
        let listed = store
            .list_objects_v2(ListObjectsV2Request::recursive(BUCKET, "v/").with_max_keys(2))
            .await
            .unwrap();

        assert!(listed.truncated);
        assert_eq!(listed.next_continuation_token, raw.next_continuation_token);
        assert_eq!(listed.key_count, raw.key_count);
        assert_eq!(listed.max_keys, 2);
        assert_eq!(listed.summaries, raw.summaries);

        let rest = store
            .list_objects_v2(
                ListObjectsV2Request::recursive(BUCKET, "v/")
                    .with_continuation_token(listed.next_continuation_token.unwrap()),
            )
            .await
            .unwrap();
        let keys: Vec<&str> = rest.summaries.iter().map(|s| s.key.as_str()).collect();
        // The fresh put is hidden even though the raw page contains it
        assert_eq!(keys, vec!["v/2"]);
    }

    #[tokio::test]
    async fn test_failure_budget_exactly_n() {
        let (store, _) = setup(InconsistencyConfig::no_faults().with_throttle(1.0, 3));

        for expected in 1..=3u64 {
            let err = store
                .put_object(PutObjectRequest::new(BUCKET, "k", &b"v"[..]))
                .await
                .unwrap_err();
            match err {
                StoreError::Throttled { failure_count } => assert_eq!(failure_count, expected),
                other => panic!("expected throttle, got {:?}", other),
            }
        }
        // Failed puts never reached the store
        assert_eq!(store.inner().object_count(BUCKET), 0);

        for _ in 0..5 {
            store
                .list_objects(ListObjectsRequest::recursive(BUCKET, ""))
                .await
                .unwrap();
        }
        assert_eq!(store.failure_count(), 3);
        assert_eq!(store.stats().throttled, 3);
        assert_eq!(store.stats().operations, 8);

        store.reset_stats();
        assert_eq!(store.stats(), InconsistencyStats::default());
        assert_eq!(store.failure_count(), 3);
    }

    #[tokio::test]
    async fn test_throttled_calls_leave_no_state() {
        let (store, _) = setup(
            InconsistencyConfig::delay_all(Duration::from_millis(WINDOW_MS)).with_throttle(1.0, 0),
        );

        assert!(store
            .put_object(PutObjectRequest::new(BUCKET, "x", &b"v"[..]))
            .await
            .is_err());
        assert!(store
            .delete_object(DeleteObjectRequest::new(BUCKET, "y"))
            .await
            .is_err());
        assert_eq!(store.state().pending_puts(), 0);
        assert_eq!(store.state().pending_deletes(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_no_state() {
        let (store, _) = delay_all();

        let err = store
            .put_object(PutObjectRequest::new("missing-bucket", "k", &b"v"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchBucket(_)));
        assert!(!err.is_injected());
        assert_eq!(store.state().pending_puts(), 0);

        let err = store
            .delete_object(DeleteObjectRequest::new("missing-bucket", "k"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchBucket(_)));
        assert_eq!(store.state().pending_deletes(), 0);
    }

    #[tokio::test]
    async fn test_set_failure_limit_rearms_throttling() {
        let (store, _) = setup(InconsistencyConfig::no_faults().with_throttle(1.0, 1));

        let list = ListObjectsRequest::recursive(BUCKET, "");
        assert!(store.list_objects(list.clone()).await.is_err());
        assert!(store.list_objects(list.clone()).await.is_ok());

        store.set_failure_limit(2);
        assert_eq!(store.failure_count(), 0);
        assert!(store.list_objects(list.clone()).await.is_err());
        assert!(store.list_objects(list.clone()).await.is_err());
        assert!(store.list_objects(list).await.is_ok());
    }

    #[tokio::test]
    async fn test_multipart_is_throttled_but_not_delayed() {
        let (store, _) = setup(
            InconsistencyConfig::delay_all(Duration::from_millis(WINDOW_MS)).with_throttle(1.0, 1),
        );

        let err = store
            .initiate_multipart_upload(InitiateMultipartUploadRequest::new(BUCKET, "mp"))
            .await
            .unwrap_err();
        assert!(err.is_injected());

        let init = store
            .initiate_multipart_upload(InitiateMultipartUploadRequest::new(BUCKET, "mp"))
            .await
            .unwrap();
        let part = store
            .upload_part(UploadPartRequest {
                bucket: BUCKET.to_string(),
                key: "mp".to_string(),
                upload_id: init.upload_id.clone(),
                part_number: 1,
                data: Bytes::from_static(b"payload"),
            })
            .await
            .unwrap();
        let uploads = store
            .list_multipart_uploads(ListMultipartUploadsRequest::new(BUCKET))
            .await
            .unwrap();
        assert_eq!(uploads.uploads.len(), 1);

        store
            .complete_multipart_upload(CompleteMultipartUploadRequest {
                bucket: BUCKET.to_string(),
                key: "mp".to_string(),
                upload_id: init.upload_id,
                parts: vec![part.into()],
            })
            .await
            .unwrap();

        // Completed uploads are strongly consistent
        assert_eq!(flat_keys(&store, "").await, vec!["mp"]);
        assert_eq!(store.state().pending_puts(), 0);
    }

    #[tokio::test]
    async fn test_clear_inconsistency_restores_pass_through() {
        let (store, clock) = delay_all();

        put(&store, "c/old").await;
        clock.advance_ms(WINDOW_MS);
        put(&store, "c/new").await;
        store
            .delete_object(DeleteObjectRequest::new(BUCKET, "c/old"))
            .await
            .unwrap();
        store
            .delete_object(DeleteObjectRequest::new(BUCKET, "c/x/y/gone"))
            .await
            .unwrap();

        store.clear_inconsistency();
        store.clear_inconsistency();

        for request in [
            ListObjectsRequest::recursive(BUCKET, "c/"),
            ListObjectsRequest::delimited(BUCKET, "c/"),
        ] {
            let raw = store.inner().list_objects(request.clone()).await.unwrap();
            let listed = store.list_objects(request).await.unwrap();
            assert_eq!(listed, raw);
        }
    }

    #[tokio::test]
    async fn test_admin_getters_and_display() {
        let (store, _) = setup(InconsistencyConfig {
            delay_key_substring: "*".to_string(),
            delay_key_probability: 0.5,
            delay_key_msec: 1234,
            throttle_probability: 0.25,
            failure_limit: 9,
        });

        assert_eq!(store.delay_key_probability(), 0.5);
        assert_eq!(store.delay_key_msec(), 1234);
        assert_eq!(store.delay_window(), Duration::from_millis(1234));
        assert_eq!(store.throttle_probability(), 0.25);
        assert_eq!(store.failure_limit(), 9);

        let shown = store.to_string();
        assert!(shown.contains("1234 msec delay"));
        assert!(shown.contains("substring \"\""));
        assert!(shown.contains("failure limit 9, failure count 0"));

        assert!(store.set_throttle_probability(1.5).is_err());
        assert_eq!(store.throttle_probability(), 0.25);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let inner = InMemoryObjectStore::new().with_bucket(BUCKET);
        let err = InconsistentObjectStore::new(
            inner,
            InconsistencyConfig {
                delay_key_probability: 1.5,
                ..Default::default()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::ProbabilityOutOfRange { .. }));
    }
}
