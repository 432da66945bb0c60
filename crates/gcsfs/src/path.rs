// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `gs://bucket/name` locations

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Result, StorageError};

pub const SCHEME: &str = "gs://";
const ROOT_DIR: char = '/';

static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9\-_.]+$").expect("bucket name pattern is valid"));

/// A parsed GCS location: a bucket and an object name, which may be empty
/// (the bucket root) or name a directory-like prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GcsPath {
    uri: Url,
    bucket: String,
    name: String,
}

impl GcsPath {
    /// Parse a user supplied path.
    ///
    /// Accepts `gs://bucket/name`, `/bucket/name` and `bucket/name`.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(StorageError::invalid_path(
                "GCS path can not be empty. The path must be of form 'gs://<bucket-name>/path'.",
            ));
        }

        let rest = if let Some(stripped) = path.strip_prefix(ROOT_DIR) {
            stripped
        } else if let Some(stripped) = path.strip_prefix(SCHEME) {
            stripped
        } else {
            path
        };

        let (bucket, name) = match rest.find(ROOT_DIR) {
            Some(idx) if idx > 0 => (&rest[..idx], &rest[idx + 1..]),
            _ => (rest, ""),
        };

        if !BUCKET_NAME.is_match(bucket) {
            return Err(StorageError::invalid_path(format!(
                "Invalid bucket name in path '{}'. Bucket name should only contain lower case \
                 alphanumeric, '-'. '_' and '.'. Please follow GCS naming convention: \
                 https://cloud.google.com/storage/docs/naming-buckets",
                path
            )));
        }

        Self::from_parts(bucket, name)
            .map_err(|_| StorageError::invalid_path(format!("Invalid path '{}'.", path)))
    }

    /// Build a path from an already validated bucket and object name.
    pub fn from_parts(bucket: &str, name: &str) -> Result<Self> {
        let uri = Url::parse(&format!("{SCHEME}{bucket}/{name}"))
            .map_err(|e| StorageError::invalid_path(e.to_string()))?;
        Ok(Self {
            uri,
            bucket: bucket.to_string(),
            name: name.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object name, without the bucket and without a leading `/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// True when the path addresses the bucket root.
    #[must_use]
    pub fn is_bucket(&self) -> bool {
        self.name.is_empty()
    }

    /// Last non-empty segment of the object name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.name.split(ROOT_DIR).rev().find(|s| !s.is_empty())
    }

    /// The object name with any trailing `/` removed.
    #[must_use]
    pub fn trimmed_name(&self) -> &str {
        self.name.trim_end_matches(ROOT_DIR)
    }

    /// A path in the same bucket with `relative` appended to this name.
    pub fn child(&self, relative: &str) -> Result<Self> {
        let relative = relative.trim_start_matches(ROOT_DIR);
        let base = self.trimmed_name();
        let name = match (base.is_empty(), relative.is_empty()) {
            (true, _) => relative.to_string(),
            (false, true) => base.to_string(),
            (false, false) => format!("{base}/{relative}"),
        };
        Self::from_parts(&self.bucket, &name)
    }
}

impl FromStr for GcsPath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for GcsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.bucket, self.name)
    }
}
