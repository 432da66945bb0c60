// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Storage client abstraction.
//!
//! A [`Storage`] is a project-scoped client: it answers bucket metadata
//! queries and hands out per-bucket [`ObjectStore`]s for object I/O.
//! [`StorageFactory`] turns a project and optional credentials into one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::Result;

/// Bucket metadata returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub default_kms_key: Option<String>,
}

/// Parameters for creating a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketSpec {
    pub name: String,
    /// Region or multi-region; the service default applies when absent.
    pub location: Option<String>,
    /// Customer managed encryption key applied as the bucket default.
    pub kms_key: Option<String>,
}

impl BucketSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_kms_key(mut self, kms_key: Option<String>) -> Self {
        self.kms_key = kms_key.filter(|k| !k.trim().is_empty());
        self
    }
}

#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Project the client bills and creates buckets in.
    fn project(&self) -> &str;

    /// Look a bucket up. `Ok(None)` means it does not exist.
    async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>>;

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<Bucket>;

    /// Object store addressing the objects of one bucket.
    fn object_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;
}

/// Builds storage clients from a project and optional credentials.
pub trait StorageFactory: Send + Sync {
    fn connect(&self, project: &str, credentials: Option<&Credentials>)
    -> Result<Arc<dyn Storage>>;
}
