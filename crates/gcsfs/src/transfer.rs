// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Object copy and move between `gs://` paths.
//!
//! A transfer is planned first: every source object is paired with its
//! destination and, unless overwriting, every destination is checked. Only
//! then are objects copied, so a conflict leaves the destination untouched.

use crate::error::{Result, StorageError};
use crate::fs::FileSystem;
use crate::path::GcsPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub recursive: bool,
    pub overwrite: bool,
}

/// One object to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPair {
    pub source: GcsPath,
    pub destination: GcsPath,
}

/// Pair each object at or below `source` with its destination.
///
/// When the destination already exists as a bucket or directory the source
/// is placed inside it under its own name, as `cp -r` does.
pub async fn plan(
    fs: &FileSystem,
    source: &GcsPath,
    destination: &GcsPath,
    options: TransferOptions,
) -> Result<Vec<ObjectPair>> {
    let storage = fs.storage();
    if storage.get_bucket(source.bucket()).await?.is_none() {
        return Err(StorageError::BucketNotFound(source.bucket().to_string()));
    }
    if storage.get_bucket(destination.bucket()).await?.is_none() {
        return Err(StorageError::BucketNotFound(
            destination.bucket().to_string(),
        ));
    }

    // A trailing `/` names a directory whether or not it exists yet
    let dest_is_file = fs.is_file(destination).await?;
    let dest_is_container = destination.is_bucket()
        || destination.name().ends_with('/')
        || fs.is_directory(destination).await?;

    let mut pairs = Vec::new();
    if fs.is_file(source).await? {
        let target = match (dest_is_container && !dest_is_file, source.file_name()) {
            (true, Some(name)) => destination.child(name)?,
            _ => destination.clone(),
        };
        pairs.push(ObjectPair {
            source: source.clone(),
            destination: target,
        });
    } else {
        let children = fs.children(source).await?;
        if children.is_empty() {
            return Err(StorageError::NotFound(source.to_string()));
        }
        if !options.recursive {
            return Err(StorageError::IsDirectory(source.to_string()));
        }

        let base = match (dest_is_container || dest_is_file, source.file_name()) {
            (true, Some(name)) => destination.child(name)?,
            _ => destination.clone(),
        };
        let prefix = source.trimmed_name();
        for child in children {
            let relative = child.name()[prefix.len()..].trim_start_matches('/');
            let target = base.child(relative)?;
            pairs.push(ObjectPair {
                source: child,
                destination: target,
            });
        }
    }

    pairs.retain(|pair| !same_object(&pair.source, &pair.destination));

    if !options.overwrite {
        for pair in &pairs {
            if fs.is_file(&pair.destination).await? {
                return Err(StorageError::AlreadyExists(pair.destination.to_string()));
            }
        }
    }

    diagnostics::debug!("Planned {count} object transfers", count: pairs.len());
    Ok(pairs)
}

/// Carry out a planned transfer. Returns the number of objects moved or copied.
pub async fn execute(
    fs: &FileSystem,
    pairs: &[ObjectPair],
    mode: TransferMode,
    overwrite: bool,
) -> Result<usize> {
    let mut transferred = 0;
    for pair in pairs {
        if same_object(&pair.source, &pair.destination) {
            continue;
        }
        fs.copy_object(&pair.source, &pair.destination, overwrite)
            .await?;
        if mode == TransferMode::Move {
            fs.delete_object(&pair.source).await?;
        }
        transferred += 1;
    }
    Ok(transferred)
}

fn same_object(a: &GcsPath, b: &GcsPath) -> bool {
    a.bucket() == b.bucket() && a.trimmed_name() == b.trimmed_name()
}
