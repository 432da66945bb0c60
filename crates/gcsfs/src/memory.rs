// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage backend.
//!
//! Each bucket is an [`InMemory`] object store. Failures can be injected
//! per bucket to exercise error paths without a live service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use object_store::path::Path;

use crate::credentials::Credentials;
use crate::error::{Result, StorageError};
use crate::path::GcsPath;
use crate::storage::{Bucket, BucketSpec, Storage, StorageFactory};

#[derive(Debug, Default)]
struct MemoryState {
    buckets: BTreeMap<String, MemoryBucket>,
    unreachable: BTreeSet<String>,
    lookup_failures: BTreeMap<String, (u16, String)>,
    connections: Vec<String>,
}

#[derive(Debug)]
struct MemoryBucket {
    info: Bucket,
    store: Arc<InMemory>,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    project: String,
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new<S: Into<String>>(project: S) -> Self {
        Self {
            project: project.into(),
            state: Mutex::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_bucket(self, name: &str) -> Self {
        self.add_bucket(name);
        self
    }

    pub fn add_bucket(&self, name: &str) {
        self.state()
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| MemoryBucket {
                info: Bucket {
                    name: name.to_string(),
                    location: None,
                    default_kms_key: None,
                },
                store: Arc::new(InMemory::new()),
            });
    }

    /// Make bucket lookups for `bucket` fail with an API error.
    pub fn fail_lookup(&self, bucket: &str, status: u16, message: &str) {
        self.state()
            .lookup_failures
            .insert(bucket.to_string(), (status, message.to_string()));
    }

    /// Make object store resolution for `bucket` fail.
    pub fn make_unreachable(&self, bucket: &str) {
        self.state().unreachable.insert(bucket.to_string());
    }

    pub fn bucket(&self, name: &str) -> Option<Bucket> {
        self.state().buckets.get(name).map(|b| b.info.clone())
    }

    /// Projects passed to [`StorageFactory::connect`], in call order.
    pub fn connections(&self) -> Vec<String> {
        self.state().connections.clone()
    }

    fn bucket_store(&self, bucket: &str) -> Result<Arc<InMemory>> {
        let state = self.state();
        if state.unreachable.contains(bucket) {
            return Err(StorageError::Unavailable(format!(
                "no file system for gs://{bucket}"
            )));
        }
        state
            .buckets
            .get(bucket)
            .map(|b| b.store.clone())
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))
    }

    /// Store an object at a `gs://` path.
    pub async fn put_object(&self, path: &str, data: impl Into<Bytes>) -> Result<()> {
        let path = GcsPath::parse(path)?;
        let store = self.bucket_store(path.bucket())?;
        let data: Bytes = data.into();
        store.put(&Path::from(path.name()), data.into()).await?;
        Ok(())
    }

    pub async fn read_object(&self, path: &str) -> Result<Bytes> {
        let path = GcsPath::parse(path)?;
        let store = self.bucket_store(path.bucket())?;
        Ok(store.get(&Path::from(path.name())).await?.bytes().await?)
    }

    /// Names of all objects in `bucket`, sorted.
    pub async fn object_names(&self, bucket: &str) -> Result<Vec<String>> {
        let store = self.bucket_store(bucket)?;
        let mut names: Vec<String> = store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn project(&self) -> &str {
        &self.project
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>> {
        let state = self.state();
        if let Some((status, message)) = state.lookup_failures.get(name) {
            return Err(StorageError::api(*status, message.clone()));
        }
        Ok(state.buckets.get(name).map(|b| b.info.clone()))
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<Bucket> {
        let mut state = self.state();
        if state.buckets.contains_key(&spec.name) {
            return Err(StorageError::BucketAlreadyExists(spec.name.clone()));
        }
        let info = Bucket {
            name: spec.name.clone(),
            location: spec.location.clone(),
            default_kms_key: spec.kms_key.clone(),
        };
        state.buckets.insert(
            spec.name.clone(),
            MemoryBucket {
                info: info.clone(),
                store: Arc::new(InMemory::new()),
            },
        );
        Ok(info)
    }

    fn object_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = self.bucket_store(bucket)?;
        Ok(store)
    }
}

/// Hands out one shared [`MemoryStorage`] regardless of credentials.
#[derive(Debug, Clone)]
pub struct MemoryStorageFactory {
    storage: Arc<MemoryStorage>,
}

impl MemoryStorageFactory {
    pub fn new(storage: Arc<MemoryStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<MemoryStorage> {
        &self.storage
    }
}

impl StorageFactory for MemoryStorageFactory {
    fn connect(
        &self,
        project: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Arc<dyn Storage>> {
        self.storage.state().connections.push(project.to_string());
        let storage: Arc<dyn Storage> = self.storage.clone();
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buckets_and_objects() {
        let storage = MemoryStorage::new("p").with_bucket("a");
        assert!(storage.get_bucket("a").await.unwrap().is_some());
        assert!(storage.get_bucket("b").await.unwrap().is_none());

        storage.put_object("gs://a/x/y.txt", "hello").await.unwrap();
        assert_eq!(storage.object_names("a").await.unwrap(), vec!["x/y.txt"]);
        assert_eq!(
            storage.read_object("gs://a/x/y.txt").await.unwrap(),
            Bytes::from("hello")
        );
    }

    #[tokio::test]
    async fn test_create_bucket() {
        let storage = MemoryStorage::new("p");
        let spec = BucketSpec::new("fresh").with_location(Some("EU".into()));
        let bucket = storage.create_bucket(&spec).await.unwrap();
        assert_eq!(bucket.location.as_deref(), Some("EU"));
        assert!(matches!(
            storage.create_bucket(&spec).await,
            Err(StorageError::BucketAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = MemoryStorage::new("p").with_bucket("a");
        storage.fail_lookup("a", 403, "denied");
        match storage.get_bucket("a").await {
            Err(StorageError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "denied");
            }
            other => panic!("unexpected {other:?}"),
        }

        storage.make_unreachable("a");
        assert!(matches!(
            storage.object_store("a"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            storage.object_store("missing"),
            Err(StorageError::BucketNotFound(_))
        ));
    }
}
