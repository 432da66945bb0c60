// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Result, anyhow};
use gcsfs::StorageFactory;
use plugins::{DeleteConfig, FailureCollector, GcsSinkConfig, PluginError, SourceDestConfig};

use crate::common::{PluginKind, load_config};

/// Validate a stage configuration, printing one line per failure.
///
/// Fails when any problem was found so scripts can test the exit status.
pub async fn validate_command<F>(
    factory: &dyn StorageFactory,
    kind: PluginKind,
    config_path: &Path,
    mut output: F,
) -> Result<()>
where
    F: FnMut(String),
{
    let mut collector = FailureCollector::new();
    let result = match kind {
        PluginKind::Delete => {
            let config: DeleteConfig = load_config(config_path)?;
            config.validate(factory, &mut collector).await
        }
        PluginKind::Copy | PluginKind::Move => {
            let config: SourceDestConfig = load_config(config_path)?;
            config.validate(factory, &mut collector).await
        }
        PluginKind::Sink => {
            let config: GcsSinkConfig = load_config(config_path)?;
            config.validate(factory, &mut collector).await
        }
    };

    let name = kind.plugin_name();
    match result {
        Ok(()) => {
            output(format!("{}: configuration is valid\n", name));
            Ok(())
        }
        Err(PluginError::Validation(err)) => {
            for failure in err.failures() {
                output(format!("{}: {}\n", name, failure));
            }
            Err(anyhow!(
                "{} configuration has {} problem(s)",
                name,
                err.failures().len()
            ))
        }
        Err(e) => Err(anyhow!("{} validation failed: {}", name, e)),
    }
}
