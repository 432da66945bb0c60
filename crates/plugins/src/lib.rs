// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Google Cloud Storage pipeline plugins.
//!
//! Each plugin is a configuration struct with a `validate` method plus the
//! operation it performs:
//!
//! - [`GcsBucketDelete`]: best-effort deletion of a list of paths
//! - [`GcsTransfer`]: copy or move between two paths
//! - [`GcsBatchSink`]: write record batches as json, avro, parquet, csv,
//!   tsv or delimited files
//!
//! Validation reports all problems at once through a [`FailureCollector`].

pub mod actions;
pub mod collector;
pub mod config;
pub mod context;
pub mod error;
pub mod sink;

pub use actions::{
    Action, DeleteConfig, DeleteStatus, DeleteSummary, GcsBucketDelete, GcsTransfer, PathOutcome,
    SourceDestConfig, TransferSummary,
};
pub use collector::{Cause, FailureCollector, ValidationError, ValidationFailure};
pub use config::{AUTO_DETECT, GcpConfig, contains_macro};
pub use context::{
    CMEK_KEY, LineageRecord, LineageSink, LoggingSink, MetricRecord, MetricsSink, RecordingSink,
    RunContext,
};
pub use error::{PluginError, Result};
pub use sink::{FileFormat, GcsBatchSink, GcsSinkConfig, SinkSummary, SinkWriter};
