// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Google Cloud Storage backend.
//!
//! Object I/O goes through [`object_store::gcp::GoogleCloudStorage`]. Bucket
//! metadata (lookup and creation) is not part of the object store API, so it
//! is served by the JSON API with a bearer token taken from the same
//! credential provider.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Result, StorageError};
use crate::storage::{Bucket, BucketSpec, Storage, StorageFactory};

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Factory for [`GcsStorage`] clients.
#[derive(Debug, Clone, Default)]
pub struct GcsStorageFactory {
    endpoint: Option<String>,
}

impl GcsStorageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point clients at another endpoint, such as a local GCS emulator.
    #[must_use]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl StorageFactory for GcsStorageFactory {
    fn connect(
        &self,
        project: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Arc<dyn Storage>> {
        Ok(Arc::new(GcsStorage::new(
            project,
            credentials.map(|c| c.path().to_path_buf()),
            self.endpoint.clone(),
        )?))
    }
}

#[derive(Debug)]
pub struct GcsStorage {
    project: String,
    service_account_path: Option<PathBuf>,
    endpoint: Option<String>,
    http: reqwest::Client,
}

impl GcsStorage {
    pub fn new(
        project: &str,
        service_account_path: Option<PathBuf>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            project: project.to_string(),
            service_account_path,
            endpoint,
            http,
        })
    }

    fn api_base(&self) -> String {
        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        format!("{}/storage/v1", endpoint.trim_end_matches('/'))
    }

    fn bucket_store(&self, bucket: &str) -> Result<GoogleCloudStorage> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        if let Some(path) = &self.service_account_path {
            builder = builder.with_service_account_path(path.to_string_lossy());
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_url(endpoint);
        }
        Ok(builder.build()?)
    }

    /// Fetch an access token. Credentials are not bucket scoped; the bucket
    /// only satisfies the builder.
    async fn bearer(&self, bucket: &str) -> Result<String> {
        let store = self.bucket_store(bucket)?;
        let credential = store.credentials().get_credential().await?;
        Ok(credential.bearer.clone())
    }
}

#[async_trait]
impl Storage for GcsStorage {
    fn project(&self) -> &str {
        &self.project
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>> {
        let token = self.bearer(name).await?;
        let response = self
            .http
            .get(format!("{}/b/{}", self.api_base(), name))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let resource: BucketResource = response.json().await?;
                Ok(Some(resource.into()))
            }
            _ => Err(api_error(response).await),
        }
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<Bucket> {
        let token = self.bearer(&spec.name).await?;
        let body = BucketResource {
            name: spec.name.clone(),
            location: spec.location.clone(),
            encryption: spec.kms_key.clone().map(|key| Encryption {
                default_kms_key_name: Some(key),
            }),
        };
        let response = self
            .http
            .post(format!("{}/b", self.api_base()))
            .query(&[("project", self.project.as_str())])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(StorageError::BucketAlreadyExists(spec.name.clone())),
            status if status.is_success() => {
                let resource: BucketResource = response.json().await?;
                Ok(resource.into())
            }
            _ => Err(api_error(response).await),
        }
    }

    fn object_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        Ok(Arc::new(self.bucket_store(bucket)?))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketResource {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption: Option<Encryption>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Encryption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_kms_key_name: Option<String>,
}

impl From<BucketResource> for Bucket {
    fn from(resource: BucketResource) -> Self {
        Bucket {
            name: resource.name,
            location: resource.location,
            default_kms_key: resource.encryption.and_then(|e| e.default_kms_key_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

async fn api_error(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    StorageError::api(status, error_message(&text))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
