// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Hadoop-style file system view over a [`Storage`].
//!
//! GCS has no directories. A path "exists" when an object has exactly that
//! name, or when objects exist below `name/`; deleting a directory deletes
//! every object below it.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode};

use crate::error::{Result, StorageError};
use crate::path::GcsPath;
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct FileSystem {
    storage: Arc<dyn Storage>,
}

impl FileSystem {
    /// Resolve the file system serving `path`.
    ///
    /// The handle is project scoped and serves paths in any bucket; `path`
    /// is only used to check that its bucket can be addressed.
    pub fn get(path: &GcsPath, storage: Arc<dyn Storage>) -> Result<Self> {
        match storage.object_store(path.bucket()) {
            Ok(_) | Err(StorageError::BucketNotFound(_)) => Ok(Self { storage }),
            Err(e) => Err(e),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn store(&self, path: &GcsPath) -> Result<Arc<dyn ObjectStore>> {
        self.storage.object_store(path.bucket())
    }

    /// True when an object with exactly this name exists.
    pub async fn is_file(&self, path: &GcsPath) -> Result<bool> {
        if path.is_bucket() || path.name().ends_with('/') {
            return Ok(false);
        }
        let store = match self.store(path) {
            Ok(store) => store,
            Err(StorageError::BucketNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match store.head(&Path::from(path.name())).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Objects strictly below `path`, sorted by name.
    pub async fn children(&self, path: &GcsPath) -> Result<Vec<GcsPath>> {
        let store = match self.store(path) {
            Ok(store) => store,
            Err(StorageError::BucketNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let base = path.trimmed_name();
        let prefix = (!base.is_empty()).then(|| Path::from(base));
        let names: BTreeSet<String> = store
            .list(prefix.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        names
            .into_iter()
            .filter(|name| name != base)
            .map(|name| GcsPath::from_parts(path.bucket(), &name))
            .collect()
    }

    pub async fn is_directory(&self, path: &GcsPath) -> Result<bool> {
        Ok(!self.children(path).await?.is_empty())
    }

    pub async fn exists(&self, path: &GcsPath) -> Result<bool> {
        if path.is_bucket() {
            return Ok(self.storage.get_bucket(path.bucket()).await?.is_some());
        }
        Ok(self.is_file(path).await? || self.is_directory(path).await?)
    }

    /// Every object at or below `path`.
    pub async fn list(&self, path: &GcsPath) -> Result<Vec<GcsPath>> {
        let mut objects = Vec::new();
        if self.is_file(path).await? {
            objects.push(GcsPath::from_parts(path.bucket(), path.trimmed_name())?);
        }
        objects.extend(self.children(path).await?);
        Ok(objects)
    }

    /// Delete `path`. A directory requires `recursive`. Returns the number
    /// of objects removed.
    pub async fn delete(&self, path: &GcsPath, recursive: bool) -> Result<usize> {
        let children = self.children(path).await?;
        if !children.is_empty() && !recursive {
            return Err(StorageError::DirectoryNotEmpty(path.to_string()));
        }

        let store = self.store(path)?;
        let mut deleted = 0;
        if self.is_file(path).await? {
            store.delete(&Path::from(path.name())).await?;
            deleted += 1;
        }
        for child in &children {
            store.delete(&Path::from(child.name())).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Delete the object named exactly `path`, leaving objects below it.
    pub async fn delete_object(&self, path: &GcsPath) -> Result<()> {
        match self.store(path)?.delete(&Path::from(path.name())).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read(&self, path: &GcsPath) -> Result<Bytes> {
        let store = self.store(path)?;
        match store.get(&Path::from(path.name())).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(&self, path: &GcsPath, data: Bytes) -> Result<()> {
        self.store(path)?
            .put(&Path::from(path.name()), data.into())
            .await?;
        Ok(())
    }

    /// Copy one object. Without `overwrite` an existing destination fails
    /// with [`StorageError::AlreadyExists`].
    pub async fn copy_object(&self, from: &GcsPath, to: &GcsPath, overwrite: bool) -> Result<()> {
        let dest_key = Path::from(to.name());
        let result = if from.bucket() == to.bucket() {
            let store = self.store(from)?;
            let source_key = Path::from(from.name());
            if overwrite {
                store.copy(&source_key, &dest_key).await
            } else {
                store.copy_if_not_exists(&source_key, &dest_key).await
            }
        } else {
            let data = self.read(from).await?;
            let mode = if overwrite {
                PutMode::Overwrite
            } else {
                PutMode::Create
            };
            self.store(to)?
                .put_opts(&dest_key, data.into(), mode.into())
                .await
                .map(|_| ())
        };

        match result {
            Ok(()) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => {
                Err(StorageError::AlreadyExists(to.to_string()))
            }
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::NotFound(from.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    async fn setup() -> (Arc<MemoryStorage>, FileSystem) {
        let storage = Arc::new(MemoryStorage::new("p").with_bucket("a").with_bucket("b"));
        for name in ["gs://a/dir/one.txt", "gs://a/dir/sub/two.txt", "gs://a/top.txt"] {
            storage.put_object(name, "data").await.unwrap();
        }
        let fs = FileSystem::get(&GcsPath::parse("gs://a").unwrap(), storage.clone()).unwrap();
        (storage, fs)
    }

    fn p(s: &str) -> GcsPath {
        GcsPath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_exists() {
        let (_, fs) = setup().await;
        assert!(fs.exists(&p("gs://a/top.txt")).await.unwrap());
        assert!(fs.exists(&p("gs://a/dir")).await.unwrap());
        assert!(fs.exists(&p("gs://a/dir/")).await.unwrap());
        assert!(fs.exists(&p("gs://a")).await.unwrap());
        assert!(!fs.exists(&p("gs://a/di")).await.unwrap());
        assert!(!fs.exists(&p("gs://a/nothing")).await.unwrap());
        assert!(!fs.exists(&p("gs://missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list() {
        let (_, fs) = setup().await;
        let names: Vec<String> = fs
            .list(&p("gs://a/dir"))
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["dir/one.txt", "dir/sub/two.txt"]);
        assert_eq!(fs.list(&p("gs://a")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_directory_requires_recursive() {
        let (storage, fs) = setup().await;
        assert!(matches!(
            fs.delete(&p("gs://a/dir"), false).await,
            Err(StorageError::DirectoryNotEmpty(_))
        ));
        assert_eq!(fs.delete(&p("gs://a/dir"), true).await.unwrap(), 2);
        assert_eq!(storage.object_names("a").await.unwrap(), vec!["top.txt"]);
        assert_eq!(fs.delete(&p("gs://a/top.txt"), false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_object_keeps_objects_below() {
        let (storage, fs) = setup().await;
        storage.put_object("gs://a/dir", "marker").await.unwrap();
        fs.delete_object(&p("gs://a/dir")).await.unwrap();
        assert_eq!(
            storage.object_names("a").await.unwrap(),
            vec!["dir/one.txt", "dir/sub/two.txt", "top.txt"]
        );
    }

    #[tokio::test]
    async fn test_copy_object_across_buckets() {
        let (storage, fs) = setup().await;
        fs.copy_object(&p("gs://a/top.txt"), &p("gs://b/copy.txt"), false)
            .await
            .unwrap();
        assert_eq!(
            storage.read_object("gs://b/copy.txt").await.unwrap(),
            Bytes::from("data")
        );

        assert!(matches!(
            fs.copy_object(&p("gs://a/top.txt"), &p("gs://b/copy.txt"), false)
                .await,
            Err(StorageError::AlreadyExists(_))
        ));
        fs.copy_object(&p("gs://a/top.txt"), &p("gs://b/copy.txt"), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_copy_object_same_bucket() {
        let (_, fs) = setup().await;
        fs.copy_object(&p("gs://a/top.txt"), &p("gs://a/dir/top.txt"), false)
            .await
            .unwrap();
        assert!(fs.is_file(&p("gs://a/dir/top.txt")).await.unwrap());
        assert!(matches!(
            fs.copy_object(&p("gs://a/top.txt"), &p("gs://a/dir/one.txt"), false)
                .await,
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_get_fails_for_unreachable_bucket() {
        let (storage, _) = setup().await;
        storage.make_unreachable("b");
        assert!(FileSystem::get(&p("gs://b/x"), storage.clone()).is_err());
        assert!(FileSystem::get(&p("gs://missing/x"), storage.clone()).is_ok());
    }
}
