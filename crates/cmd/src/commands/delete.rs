// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use gcsfs::StorageFactory;
use plugins::{Action, DeleteConfig, DeleteStatus, DeleteSummary, GcsBucketDelete, RunContext};

use crate::common::load_config;

/// Run `GCSBucketDelete` and print the outcome of each path.
///
/// Paths that could not be deleted are reported but do not fail the command.
pub async fn delete_command<F>(
    factory: &dyn StorageFactory,
    context: &RunContext,
    config_path: &Path,
    mut output: F,
) -> Result<DeleteSummary>
where
    F: FnMut(String),
{
    let config: DeleteConfig = load_config(config_path)?;
    let action = GcsBucketDelete::new(config);
    let summary = action
        .run(factory, context)
        .await
        .with_context(|| format!("{} failed", action.name()))?;

    for outcome in &summary.outcomes {
        let status = match &outcome.status {
            DeleteStatus::Deleted(count) => format!("deleted ({} objects)", count),
            DeleteStatus::NotFound => "not found".to_string(),
            DeleteStatus::Skipped(reason) => format!("skipped: {}", reason),
            DeleteStatus::Failed(reason) => format!("failed: {}", reason),
        };
        output(format!("{} {}\n", outcome.path, status));
    }
    output(format!("{}\n", summary));

    Ok(summary)
}
