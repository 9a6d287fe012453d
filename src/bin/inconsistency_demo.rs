//! Walk through a delayed put and a delayed delete on the in-memory backend.
//!
//! Usage: `inconsistency-demo [config.toml]`
//!
//! Without a path the config comes from the `FAILINJECT_*` environment
//! variables. Every key is delayed for the demo regardless of the configured
//! substring, and throttling is taken from the config as-is.

use inconsistent_store::store::{
    DeleteObjectRequest, ListObjectsRequest, ObjectStore, PutObjectRequest,
};
use inconsistent_store::{InMemoryObjectStore, InconsistencyConfig, InconsistentObjectStore};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BUCKET: &str = "demo";
const MAX_ATTEMPTS: u32 = 10;

async fn list_keys<S: ObjectStore>(store: &S, prefix: &str) -> Vec<String> {
    for attempt in 1..=MAX_ATTEMPTS {
        match store
            .list_objects(ListObjectsRequest::recursive(BUCKET, prefix))
            .await
        {
            Ok(listing) => return listing.summaries.into_iter().map(|s| s.key).collect(),
            Err(e) if e.is_retryable() => warn!("list attempt {} failed: {}", attempt, e),
            Err(e) => {
                warn!("list failed: {}", e);
                break;
            }
        }
    }
    Vec::new()
}

async fn retry<T, F, Fut>(what: &str, mut op: F) -> Result<T, Box<dyn std::error::Error>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = inconsistent_store::StoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!("{} attempt {} failed: {}", what, attempt, e)
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            InconsistencyConfig::from_toml_str(&std::fs::read_to_string(&path)?)?
        }
        None => InconsistencyConfig::from_env()?,
    };
    info!("Loaded config: {}", config);
    config.delay_key_substring.clear();
    config.delay_key_probability = 1.0;
    let window = config.delay_window();

    let inner = InMemoryObjectStore::new().with_bucket(BUCKET);
    let store = InconsistentObjectStore::new(inner, config)?;

    println!("Inconsistent Object Store Demo");
    println!("==============================");
    println!("{}", store);
    println!();

    retry("put", || {
        store.put_object(PutObjectRequest::new(BUCKET, "dir/file", &b"hello"[..]))
    })
    .await?;
    println!("after put:             {:?}", list_keys(&store, "dir/").await);
    println!("underlying store:      {:?}", list_keys(store.inner(), "dir/").await);

    tokio::time::sleep(window + Duration::from_millis(50)).await;
    println!("after {:?}:        {:?}", window, list_keys(&store, "dir/").await);

    retry("delete", || {
        store.delete_object(DeleteObjectRequest::new(BUCKET, "dir/file"))
    })
    .await?;
    println!("after delete:          {:?}", list_keys(&store, "dir/").await);
    println!("underlying store:      {:?}", list_keys(store.inner(), "dir/").await);

    tokio::time::sleep(window + Duration::from_millis(50)).await;
    println!("after {:?}:        {:?}", window, list_keys(&store, "dir/").await);

    println!();
    println!("Statistics:");
    println!("{}", serde_json::to_string_pretty(&store.stats())?);

    Ok(())
}
