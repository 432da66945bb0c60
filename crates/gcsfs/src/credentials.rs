// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Service account credentials and project detection

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, StorageError};

/// Environment variables consulted, in order, to detect the project id.
pub const PROJECT_ENV_VARS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

/// The subset of a service account JSON key that the plugins read.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
}

/// A service account key file, loaded and checked.
#[derive(Debug, Clone)]
pub struct Credentials {
    path: PathBuf,
    key: ServiceAccountKey,
}

impl Credentials {
    /// Read and parse the key file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content =
            std::fs::read_to_string(&path).map_err(|source| StorageError::CredentialsFile {
                path: path.clone(),
                source,
            })?;
        let key = serde_json::from_str(&content).map_err(|source| {
            StorageError::CredentialsFormat {
                path: path.clone(),
                source,
            }
        })?;
        Ok(Self { path, key })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }
}

/// Detect the default project from the environment, then from the key file.
pub fn detect_project(credentials: Option<&Credentials>) -> Result<String> {
    detect_project_with(|name| std::env::var(name).ok(), credentials)
}

fn detect_project_with<F>(lookup: F, credentials: Option<&Credentials>) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    PROJECT_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .chain(credentials.and_then(|c| c.key.project_id.clone()))
        .find(|project| !project.trim().is_empty())
        .ok_or(StorageError::ProjectNotDetected)
}
