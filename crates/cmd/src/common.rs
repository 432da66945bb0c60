// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use plugins::RunContext;
use serde::de::DeserializeOwned;

/// Which plugin a stage file configures
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PluginKind {
    /// GCSBucketDelete action
    Delete,
    /// GCSCopy action
    Copy,
    /// GCSMove action
    Move,
    /// GCS batch sink
    Sink,
}

impl PluginKind {
    pub fn plugin_name(&self) -> &'static str {
        match self {
            PluginKind::Delete => plugins::GcsBucketDelete::NAME,
            PluginKind::Copy => plugins::GcsTransfer::COPY,
            PluginKind::Move => plugins::GcsTransfer::MOVE,
            PluginKind::Sink => plugins::GcsBatchSink::NAME,
        }
    }
}

/// Load a stage configuration. `.json` files are read as JSON, anything
/// else as YAML.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON config {}", path.display()))
    } else {
        serde_yaml_ng::from_str(&text)
            .with_context(|| format!("Failed to parse YAML config {}", path.display()))
    }
}

/// Parse a `key=value` runtime argument.
pub fn parse_arg(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid argument '{}': expected key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Invalid argument '{}': empty key", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse an RFC 3339 logical start time.
pub fn parse_start_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid start time '{}': expected RFC 3339", raw))
}

/// Build the run context from command line runtime arguments.
pub fn run_context(args: &[String], start_time: Option<&str>) -> Result<RunContext> {
    let arguments = args
        .iter()
        .map(|a| parse_arg(a))
        .collect::<Result<BTreeMap<_, _>>>()?;

    let mut context = RunContext::new().with_arguments(arguments);
    if let Some(raw) = start_time {
        context = context.with_logical_start_time(parse_start_time(raw)?);
    }
    Ok(context)
}
