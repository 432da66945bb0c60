// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use gcsfs::{StorageFactory, TransferMode};
use plugins::{Action, GcsTransfer, RunContext, SourceDestConfig, TransferSummary};

use crate::common::load_config;

/// Run `GCSCopy` or `GCSMove` from a stage file.
pub async fn transfer_command<F>(
    factory: &dyn StorageFactory,
    context: &RunContext,
    mode: TransferMode,
    config_path: &Path,
    mut output: F,
) -> Result<TransferSummary>
where
    F: FnMut(String),
{
    let config: SourceDestConfig = load_config(config_path)?;
    let action = match mode {
        TransferMode::Copy => GcsTransfer::copy(config),
        TransferMode::Move => GcsTransfer::moving(config),
    };

    let summary = action
        .run(factory, context)
        .await
        .with_context(|| format!("{} failed", action.name()))?;

    output(format!("{}\n", summary));
    Ok(summary)
}
