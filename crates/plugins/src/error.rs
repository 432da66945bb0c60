// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use gcsfs::StorageError;
use thiserror::Error;

use crate::collector::ValidationError;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(
        "Unable to access or create bucket at path {bucket}. Ensure you entered the correct bucket path."
    )]
    BucketAccess {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid suffix : {0}")]
    InvalidSuffix(String),

    #[error("Invalid delimiter '{0}'. The delimiter must be a single ASCII character.")]
    InvalidDelimiter(String),

    #[error("Output directory '{0}' already exists and is not empty.")]
    OutputExists(String),

    /// Input records that do not fit the configured schema.
    #[error("Record error: {0}")]
    Record(String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl PluginError {
    pub fn record<S: Into<String>>(message: S) -> Self {
        PluginError::Record(message.into())
    }

    /// Validation failures, when this is a validation error.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            PluginError::Validation(e) => Some(e),
            _ => None,
        }
    }
}
