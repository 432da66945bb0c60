// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! What a plugin sees of the pipeline run that invokes it.
//!
//! Metrics and lineage are owned by the surrounding engine. Plugins report
//! to them through [`MetricsSink`] and [`LineageSink`]; [`LoggingSink`]
//! writes reports to the diagnostics log and [`RecordingSink`] keeps them
//! in memory.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

/// Runtime argument naming the customer managed key for new buckets.
pub const CMEK_KEY: &str = "gcp.cmek.key.name";

pub trait MetricsSink: Send + Sync {
    /// Set a gauge.
    fn gauge(&self, name: &str, value: i64);

    /// Increment a counter.
    fn count(&self, name: &str, delta: i64);
}

pub trait LineageSink: Send + Sync {
    /// Record that `fields` were written to the plugin's dataset.
    fn record_write(&self, operation: &str, description: &str, fields: &[String]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl MetricsSink for LoggingSink {
    fn gauge(&self, name: &str, value: i64) {
        diagnostics::info!("Metric {name} = {value}", name: name, value: value);
    }

    fn count(&self, name: &str, delta: i64) {
        diagnostics::info!("Metric {name} += {delta}", name: name, delta: delta);
    }
}

impl LineageSink for LoggingSink {
    fn record_write(&self, operation: &str, description: &str, fields: &[String]) {
        let fields = fields.join(",");
        diagnostics::info!(
            "Lineage {operation}: {description} fields {fields}",
            operation: operation,
            description: description,
            fields: fields
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricRecord {
    Gauge(String, i64),
    Count(String, i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageRecord {
    pub operation: String,
    pub description: String,
    pub fields: Vec<String>,
}

/// Keeps every metric and lineage report.
#[derive(Debug, Default)]
pub struct RecordingSink {
    metrics: Mutex<Vec<MetricRecord>>,
    lineage: Mutex<Vec<LineageRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<MetricRecord> {
        lock(&self.metrics).clone()
    }

    pub fn lineage(&self) -> Vec<LineageRecord> {
        lock(&self.lineage).clone()
    }

    /// Last value of gauge `name`.
    pub fn gauge_value(&self, name: &str) -> Option<i64> {
        lock(&self.metrics).iter().rev().find_map(|m| match m {
            MetricRecord::Gauge(n, v) if n == name => Some(*v),
            _ => None,
        })
    }

    /// Sum of counter `name`.
    pub fn count_total(&self, name: &str) -> i64 {
        lock(&self.metrics)
            .iter()
            .map(|m| match m {
                MetricRecord::Count(n, v) if n == name => *v,
                _ => 0,
            })
            .sum()
    }
}

impl MetricsSink for RecordingSink {
    fn gauge(&self, name: &str, value: i64) {
        lock(&self.metrics).push(MetricRecord::Gauge(name.to_string(), value));
    }

    fn count(&self, name: &str, delta: i64) {
        lock(&self.metrics).push(MetricRecord::Count(name.to_string(), delta));
    }
}

impl LineageSink for RecordingSink {
    fn record_write(&self, operation: &str, description: &str, fields: &[String]) {
        lock(&self.lineage).push(LineageRecord {
            operation: operation.to_string(),
            description: description.to_string(),
            fields: fields.to_vec(),
        });
    }
}

/// Runtime arguments, logical start time and report sinks of one run.
#[derive(Clone)]
pub struct RunContext {
    arguments: BTreeMap<String, String>,
    logical_start_time: DateTime<Utc>,
    metrics: Arc<dyn MetricsSink>,
    lineage: Arc<dyn LineageSink>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("arguments", &self.arguments)
            .field("logical_start_time", &self.logical_start_time)
            .finish_non_exhaustive()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// A context starting now, reporting to the log.
    pub fn new() -> Self {
        Self {
            arguments: BTreeMap::new(),
            logical_start_time: Utc::now(),
            metrics: Arc::new(LoggingSink),
            lineage: Arc::new(LoggingSink),
        }
    }

    /// A context reporting to `sink`.
    pub fn recording(sink: Arc<RecordingSink>) -> Self {
        Self::new()
            .with_metrics(sink.clone())
            .with_lineage(sink)
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: BTreeMap<String, String>) -> Self {
        self.arguments = arguments;
        self
    }

    #[must_use]
    pub fn with_argument<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_logical_start_time(mut self, time: DateTime<Utc>) -> Self {
        self.logical_start_time = time;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_lineage(mut self, lineage: Arc<dyn LineageSink>) -> Self {
        self.lineage = lineage;
        self
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }

    pub fn arguments(&self) -> &BTreeMap<String, String> {
        &self.arguments
    }

    pub fn logical_start_time(&self) -> DateTime<Utc> {
        self.logical_start_time
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    pub fn lineage(&self) -> &dyn LineageSink {
        self.lineage.as_ref()
    }
}
