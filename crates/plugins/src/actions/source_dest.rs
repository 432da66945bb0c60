// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Source and destination properties of the copy and move actions.

use gcsfs::{GcsPath, StorageFactory, TransferOptions};
use serde::{Deserialize, Serialize};

use crate::collector::FailureCollector;
use crate::config::{Attach, CORRECT_BUCKET_PATH, GcpConfig, check_path, contains_macro};
use crate::error::Result;

pub const NAME_SOURCE_PATH: &str = "sourcePath";
pub const NAME_DEST_PATH: &str = "destPath";
pub const NAME_OVERWRITE: &str = "overwrite";
pub const NAME_RECURSIVE: &str = "recursive";

const CREATE_DEST_BUCKET: &str =
    "Please create the bucket or ensure you entered the correct bucket path.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDestConfig {
    #[serde(flatten)]
    pub gcp: GcpConfig,
    /// Source object or directory.
    pub source_path: String,
    /// Destination; its bucket must already exist.
    pub dest_path: String,
    #[serde(default)]
    pub overwrite: Option<bool>,
    #[serde(default)]
    pub recursive: Option<bool>,
}

impl SourceDestConfig {
    pub fn source(&self) -> gcsfs::Result<GcsPath> {
        GcsPath::parse(&self.source_path)
    }

    pub fn destination(&self) -> gcsfs::Result<GcsPath> {
        GcsPath::parse(&self.dest_path)
    }

    pub fn should_overwrite(&self) -> bool {
        self.overwrite.unwrap_or(false)
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive.unwrap_or(false)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            recursive: self.is_recursive(),
            overwrite: self.should_overwrite(),
        }
    }

    /// Check both sides, reporting failures of each before returning.
    pub async fn validate(
        &self,
        factory: &dyn StorageFactory,
        collector: &mut FailureCollector,
    ) -> Result<()> {
        let check_source = !contains_macro(Some(&self.source_path));
        let check_dest = !contains_macro(Some(&self.dest_path));

        if check_source || check_dest {
            let parsed = [
                check_source.then(|| GcsPath::parse(&self.source_path).is_ok()),
                check_dest.then(|| GcsPath::parse(&self.dest_path).is_ok()),
            ];
            // Connect only when some side parses
            let storage = if parsed.iter().any(|p| *p == Some(true)) {
                self.gcp.connect(factory, collector)
            } else {
                None
            };

            if check_source {
                check_path(
                    &self.source_path,
                    Attach::Property(NAME_SOURCE_PATH),
                    storage.as_ref(),
                    Some(CORRECT_BUCKET_PATH),
                    CORRECT_BUCKET_PATH,
                    collector,
                )
                .await;
            }
            if check_dest {
                check_path(
                    &self.dest_path,
                    Attach::Property(NAME_DEST_PATH),
                    storage.as_ref(),
                    Some(CREATE_DEST_BUCKET),
                    CREATE_DEST_BUCKET,
                    collector,
                )
                .await;
            }
        }

        collector.get_or_error()?;
        Ok(())
    }
}
