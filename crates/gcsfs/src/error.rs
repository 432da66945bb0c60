// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for GCS storage operations

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// A path string that is not a valid `gs://` location. The message is
    /// shown to users as is.
    #[error("{0}")]
    InvalidPath(String),

    #[error("Unable to read service account file '{}': {source}", path.display())]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service account file '{}': {source}", path.display())]
    CredentialsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Could not detect Google Cloud project id from the environment. Please specify a project id."
    )]
    ProjectNotDetected,

    #[error("Bucket '{0}' does not exist.")]
    BucketNotFound(String),

    #[error("Bucket '{0}' already exists.")]
    BucketAlreadyExists(String),

    #[error("Storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Path '{0}' does not exist.")]
    NotFound(String),

    #[error("{0} already exists.")]
    AlreadyExists(String),

    #[error("Path '{0}' is a directory. Set 'recursive' to true to copy or move directories.")]
    IsDirectory(String),

    #[error("Directory '{0}' is not empty.")]
    DirectoryNotEmpty(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn invalid_path<S: Into<String>>(message: S) -> Self {
        StorageError::InvalidPath(message.into())
    }

    pub fn api<S: Into<String>>(status: u16, message: S) -> Self {
        StorageError::Api {
            status,
            message: message.into(),
        }
    }

    /// True for errors caused by the user's input rather than the service.
    #[must_use]
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, StorageError::InvalidPath(_))
    }

    /// True for credential loading failures.
    #[must_use]
    pub fn is_credentials(&self) -> bool {
        matches!(
            self,
            StorageError::CredentialsFile { .. } | StorageError::CredentialsFormat { .. }
        )
    }
}
