// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Google Cloud Storage access for the pipeline plugins.
//!
//! - [`GcsPath`]: parsing and validation of `gs://bucket/name` strings
//! - [`Storage`] / [`StorageFactory`]: project scoped storage clients
//! - [`GcsStorage`]: the live service, [`MemoryStorage`]: in-process
//! - [`FileSystem`]: directory semantics over flat object names
//! - [`transfer`]: planned copy and move

pub mod credentials;
pub mod error;
pub mod fs;
pub mod gcs;
pub mod memory;
pub mod path;
pub mod storage;
pub mod transfer;

pub use credentials::{Credentials, ServiceAccountKey, detect_project};
pub use error::{Result, StorageError};
pub use fs::FileSystem;
pub use gcs::{GcsStorage, GcsStorageFactory};
pub use memory::{MemoryStorage, MemoryStorageFactory};
pub use path::{GcsPath, SCHEME};
pub use storage::{Bucket, BucketSpec, Storage, StorageFactory};
pub use transfer::{ObjectPair, TransferMode, TransferOptions};
