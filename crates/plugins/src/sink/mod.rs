// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `GCS` batch sink: writes records as files in a directory on Google
//! Cloud Storage.
//!
//! A run has two steps. [`GcsBatchSink::prepare_run`] validates the
//! configuration, creates the bucket when it is missing and checks the
//! output directory. The returned [`SinkWriter`] accepts batches and,
//! on [`SinkWriter::finish`], writes one part file plus a `_SUCCESS`
//! marker and reports lineage and metrics.

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use gcsfs::{BucketSpec, FileSystem, GcsPath, StorageFactory};
use serde::{Deserialize, Serialize};

use crate::collector::FailureCollector;
use crate::config::{
    Attach, CORRECT_BUCKET_PATH, GcpConfig, check_path, contains_macro, validate_reference_name,
};
use crate::context::{CMEK_KEY, RunContext};
use crate::error::{PluginError, Result};

pub mod format;
pub mod schema;
pub mod suffix;

pub use format::FileFormat;
pub use suffix::DateSuffix;

pub const NAME_PATH: &str = "path";
pub const NAME_SUFFIX: &str = "suffix";
pub const NAME_FORMAT: &str = "format";
pub const NAME_DELIMITER: &str = "delimiter";
pub const NAME_SCHEMA: &str = "schema";
pub const NAME_LOCATION: &str = "location";

/// Name of the single part file, before the format extension.
pub const PART_FILE: &str = "part-r-00000";
/// Marker written after the part file.
pub const SUCCESS_FILE: &str = "_SUCCESS";

const RECORDS_OUT: &str = "records.out";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsSinkConfig {
    #[serde(flatten)]
    pub gcp: GcpConfig,
    /// Dataset name recorded in lineage.
    pub reference_name: String,
    /// Directory to write to, `gs://<bucket>/path/to/directory`.
    pub path: String,
    /// Date pattern appended to the path, e.g. `yyyy-MM-dd-HH-mm`.
    #[serde(default)]
    pub suffix: Option<String>,
    pub format: String,
    /// Field separator of the `delimited` format.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Record schema in Avro JSON notation.
    #[serde(default)]
    pub schema: Option<String>,
    /// Where to create the bucket if it does not exist.
    #[serde(default)]
    pub location: Option<String>,
}

impl GcsSinkConfig {
    pub fn gcs_path(&self) -> gcsfs::Result<GcsPath> {
        GcsPath::parse(&self.path)
    }

    pub fn bucket(&self) -> gcsfs::Result<String> {
        Ok(self.gcs_path()?.bucket().to_string())
    }

    pub fn file_format(&self) -> Result<FileFormat> {
        self.format.parse()
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        format::parse_delimiter(self.delimiter.as_deref())
    }

    pub fn date_suffix(&self) -> Result<Option<DateSuffix>> {
        self.suffix
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(DateSuffix::compile)
            .transpose()
    }

    /// The configured schema; `None` when absent or still a macro.
    pub fn parsed_schema(&self) -> Result<Option<SchemaRef>> {
        match self.schema.as_deref() {
            None => Ok(None),
            Some(s) if s.trim().is_empty() || contains_macro(Some(s)) => Ok(None),
            Some(s) => Ok(Some(Arc::new(schema::parse_schema(s)?))),
        }
    }

    pub async fn validate(
        &self,
        factory: &dyn StorageFactory,
        collector: &mut FailureCollector,
    ) -> Result<()> {
        validate_reference_name(&self.reference_name, collector);

        if !contains_macro(Some(&self.path)) {
            let storage = if GcsPath::parse(&self.path).is_ok() {
                self.gcp.connect_with_action(factory, collector, None)
            } else {
                None
            };
            // The bucket is created at run time when missing
            check_path(
                &self.path,
                Attach::Property(NAME_PATH),
                storage.as_ref(),
                None,
                CORRECT_BUCKET_PATH,
                collector,
            )
            .await;
        }

        if !contains_macro(self.suffix.as_deref()) {
            if let Err(e) = self.date_suffix() {
                collector
                    .add_failure(e.to_string(), None)
                    .with_config_property(NAME_SUFFIX);
            }
        }

        if !contains_macro(Some(&self.format)) {
            match self.file_format() {
                Ok(FileFormat::Delimited) if !contains_macro(self.delimiter.as_deref()) => {
                    if let Err(e) = self.delimiter_byte() {
                        collector
                            .add_failure(e.to_string(), None)
                            .with_config_property(NAME_DELIMITER);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    collector
                        .add_failure(e.to_string(), None)
                        .with_config_property(NAME_FORMAT);
                }
            }
        }

        if let Err(e) = self.parsed_schema() {
            collector
                .add_failure(e.to_string(), None)
                .with_config_property(NAME_SCHEMA);
        }

        collector.get_or_error()?;
        Ok(())
    }
}

pub struct GcsBatchSink {
    config: GcsSinkConfig,
}

impl GcsBatchSink {
    pub const NAME: &'static str = "GCS";

    pub fn new(config: GcsSinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GcsSinkConfig {
        &self.config
    }

    /// Deployment time validation.
    pub async fn configure_pipeline(&self, factory: &dyn StorageFactory) -> Result<()> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await
    }

    /// Validate, make sure the bucket exists and open the output directory.
    pub async fn prepare_run(
        &self,
        factory: &dyn StorageFactory,
        context: &RunContext,
    ) -> Result<SinkWriter> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await?;

        let storage = self.config.gcp.connect_or_error(factory)?;
        let base = self.config.gcs_path()?;
        let bucket = base.bucket().to_string();

        let access = |source| PluginError::BucketAccess {
            bucket: bucket.clone(),
            source,
        };
        if storage.get_bucket(&bucket).await.map_err(access)?.is_none() {
            let spec = BucketSpec::new(bucket.as_str())
                .with_location(self.config.location.clone())
                .with_kms_key(context.argument(CMEK_KEY).map(str::to_string));
            let created = storage.create_bucket(&spec).await.map_err(access)?;
            let location = created.location.unwrap_or_default();
            diagnostics::info!("Created bucket {bucket} in {location}", bucket: bucket.as_str(), location: location);
        }

        let output = match self.config.date_suffix()? {
            Some(suffix) => base.child(&suffix.format(context.logical_start_time()))?,
            None => base,
        };

        let fs = FileSystem::get(&output, storage)?;
        if fs.is_directory(&output).await? {
            return Err(PluginError::OutputExists(output.to_string()));
        }

        Ok(SinkWriter {
            fs,
            output,
            format: self.config.file_format()?,
            delimiter: self.config.delimiter_byte()?,
            schema: self.config.parsed_schema()?,
            batches: Vec::new(),
            records: 0,
        })
    }

    /// Prepare, write every batch and finish.
    pub async fn run<I>(
        &self,
        factory: &dyn StorageFactory,
        context: &RunContext,
        batches: I,
    ) -> Result<SinkSummary>
    where
        I: IntoIterator<Item = RecordBatch>,
    {
        let mut writer = self.prepare_run(factory, context).await?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.finish(context).await
    }
}

/// Batches accepted for one output directory.
#[derive(Debug)]
pub struct SinkWriter {
    fs: FileSystem,
    output: GcsPath,
    format: FileFormat,
    delimiter: u8,
    schema: Option<SchemaRef>,
    batches: Vec<RecordBatch>,
    records: usize,
}

impl SinkWriter {
    pub fn output(&self) -> &GcsPath {
        &self.output
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Buffer a batch, converted to the configured schema when there is one.
    pub fn write(&mut self, batch: RecordBatch) -> Result<()> {
        let batch = match &self.schema {
            Some(schema) => schema::conform(&batch, schema)?,
            None => batch,
        };
        if let Some(first) = self.batches.first() {
            if first.schema() != batch.schema() {
                return Err(PluginError::record(
                    "All batches written without a configured schema must share one schema",
                ));
            }
        }
        self.records += batch.num_rows();
        self.batches.push(batch);
        Ok(())
    }

    /// Write the part file and success marker, then report the output.
    pub async fn finish(self, context: &RunContext) -> Result<SinkSummary> {
        let schema = self
            .schema
            .clone()
            .or_else(|| self.batches.first().map(RecordBatch::schema));

        let mut files = Vec::new();
        if let Some(schema) = &schema {
            if !self.batches.is_empty() {
                let data = format::encode(self.format, self.delimiter, schema.clone(), &self.batches)?;
                let part = self
                    .output
                    .child(&format!("{}.{}", PART_FILE, self.format.extension()))?;
                self.fs.write(&part, data).await?;
                files.push(part);
            }
        }
        let marker = self.output.child(SUCCESS_FILE)?;
        self.fs.write(&marker, Bytes::new()).await?;

        if let Some(schema) = &schema {
            let fields: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
            context
                .lineage()
                .record_write("Write", "Wrote to Google Cloud Storage.", &fields);
        }
        context.metrics().count(RECORDS_OUT, self.records as i64);

        let output = self.output.to_string();
        let records = self.records;
        diagnostics::info!("Wrote {records} records to {output}", records: records, output: output);

        Ok(SinkSummary {
            output: self.output,
            files,
            records: self.records,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    /// Output directory, including the suffix.
    pub output: GcsPath,
    /// Part files written.
    pub files: Vec<GcsPath>,
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordingSink;
    use arrow_array::{ArrayRef, Int64Array, StringArray};
    use chrono::{TimeZone, Utc};
    use gcsfs::{MemoryStorage, MemoryStorageFactory};

    const SCHEMA: &str = r#"{"type": "record", "name": "row", "fields": [
        {"name": "id", "type": "long"},
        {"name": "name", "type": ["null", "string"]}
    ]}"#;

    fn config(path: &str, format: &str) -> GcsSinkConfig {
        GcsSinkConfig {
            gcp: GcpConfig {
                project: Some("p".to_string()),
                service_file_path: None,
            },
            reference_name: "sink".to_string(),
            path: path.to_string(),
            suffix: None,
            format: format.to_string(),
            delimiter: None,
            schema: None,
            location: None,
        }
    }

    fn factory() -> (Arc<MemoryStorage>, MemoryStorageFactory) {
        let storage = Arc::new(MemoryStorage::new("p").with_bucket("out"));
        (storage.clone(), MemoryStorageFactory::new(storage))
    }

    fn rows() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec![Some("a"), None])) as ArrayRef),
        ])
        .unwrap()
    }

    async fn failures_for(config: GcsSinkConfig) -> Vec<String> {
        let (_, factory) = factory();
        let mut collector = FailureCollector::new();
        match config.validate(&factory, &mut collector).await {
            Ok(()) => Vec::new(),
            Err(e) => e
                .validation()
                .unwrap()
                .failures()
                .iter()
                .map(|f| f.message().to_string())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_accepts_every_format() {
        for format in ["json", "avro", "parquet", "csv", "tsv", "delimited"] {
            assert!(failures_for(config("gs://out/dir", format)).await.is_empty(), "{format}");
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_properties() {
        let mut bad = config("gs://out/dir", "xml");
        bad.suffix = Some("yyyy-qq".to_string());
        bad.schema = Some("{".to_string());
        bad.reference_name = "has space".to_string();
        let failures = failures_for(bad).await;
        assert_eq!(failures.len(), 4);
        assert_eq!(failures[0], "Invalid reference name 'has space'.");
        assert_eq!(failures[1], "Invalid suffix : Illegal pattern character 'q'");
        assert!(failures[2].starts_with("Invalid format 'xml'."));
        assert!(failures[3].starts_with("Invalid schema: "));
    }

    #[tokio::test]
    async fn test_validation_details() {
        // A missing bucket is created later
        assert!(failures_for(config("gs://newbucket/dir", "csv")).await.is_empty());

        let failures = failures_for(config("gs://UPPER/dir", "csv")).await;
        assert!(failures[0].starts_with("Invalid bucket name in path 'gs://UPPER/dir'."));

        let mut delimited = config("gs://out/dir", "delimited");
        delimited.delimiter = Some("::".to_string());
        assert_eq!(failures_for(delimited).await.len(), 1);

        let mut macros = config("gs://${bucket}/dir", "${format}");
        macros.suffix = Some("${suffix}".to_string());
        macros.schema = Some("${schema}".to_string());
        assert!(failures_for(macros).await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_key_file_has_no_corrective_action() {
        let (_, factory) = factory();
        let mut bad = config("gs://out/dir", "csv");
        bad.gcp.service_file_path = Some("/nonexistent/sa.json".to_string());
        let mut collector = FailureCollector::new();
        let err = bad.validate(&factory, &mut collector).await.unwrap_err();

        let failures = err.validation().unwrap().failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].concerns(crate::config::NAME_SERVICE_ACCOUNT_FILE_PATH));
        assert_eq!(failures[0].corrective_action(), None);
    }

    #[tokio::test]
    async fn test_writes_under_suffix_and_creates_bucket() {
        let (storage, factory) = factory();
        let sink_reports = Arc::new(RecordingSink::new());
        let context = RunContext::recording(sink_reports.clone())
            .with_logical_start_time(Utc.with_ymd_and_hms(2015, 1, 1, 20, 42, 0).unwrap())
            .with_argument(CMEK_KEY, "projects/p/keys/k");

        let mut config = config("gs://fresh/exports", "csv");
        config.suffix = Some("yyyy-MM-dd-HH-mm".to_string());
        config.location = Some("EU".to_string());
        let sink = GcsBatchSink::new(config);

        let summary = sink.run(&factory, &context, vec![rows(), rows()]).await.unwrap();
        assert_eq!(summary.output.to_string(), "gs://fresh/exports/2015-01-01-20-42");
        assert_eq!(summary.records, 4);

        let bucket = storage.bucket("fresh").unwrap();
        assert_eq!(bucket.location.as_deref(), Some("EU"));
        assert_eq!(bucket.default_kms_key.as_deref(), Some("projects/p/keys/k"));

        assert_eq!(
            storage.object_names("fresh").await.unwrap(),
            vec![
                "exports/2015-01-01-20-42/_SUCCESS",
                "exports/2015-01-01-20-42/part-r-00000.csv"
            ]
        );
        assert_eq!(
            storage
                .read_object("gs://fresh/exports/2015-01-01-20-42/part-r-00000.csv")
                .await
                .unwrap(),
            Bytes::from("1,a\n2,\n1,a\n2,\n")
        );
        assert_eq!(sink_reports.count_total("records.out"), 4);
        let lineage = sink_reports.lineage();
        assert_eq!(lineage[0].operation, "Write");
        assert_eq!(lineage[0].description, "Wrote to Google Cloud Storage.");
        assert_eq!(lineage[0].fields, vec!["id", "name"]);
    }

    #[tokio::test]
    async fn test_schema_is_applied() {
        let (storage, factory) = factory();
        let mut config = config("gs://out/typed", "json");
        config.schema = Some(SCHEMA.to_string());
        let input = RecordBatch::try_from_iter(vec![(
            "id",
            Arc::new(StringArray::from(vec!["7"])) as ArrayRef,
        )])
        .unwrap();

        GcsBatchSink::new(config)
            .run(&factory, &RunContext::new(), vec![input])
            .await
            .unwrap();
        assert_eq!(
            storage
                .read_object("gs://out/typed/part-r-00000.json")
                .await
                .unwrap(),
            Bytes::from("{\"id\":7}\n")
        );
    }

    #[tokio::test]
    async fn test_existing_output_fails() {
        let (storage, factory) = factory();
        storage.put_object("gs://out/dir/old.csv", "x").await.unwrap();
        let err = GcsBatchSink::new(config("gs://out/dir", "csv"))
            .prepare_run(&factory, &RunContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::OutputExists(_)));
    }

    #[tokio::test]
    async fn test_bucket_lookup_failure() {
        let (storage, factory) = factory();
        storage.fail_lookup("locked", 403, "forbidden");
        let sink = GcsBatchSink::new(config("gs://out/dir", "csv"));
        sink.configure_pipeline(&factory).await.unwrap();

        let locked = GcsBatchSink::new(config("gs://locked/dir", "csv"));
        let mut collector = FailureCollector::new();
        let err = locked.config().validate(&factory, &mut collector).await.unwrap_err();
        assert_eq!(
            err.validation().unwrap().failures()[0].corrective_action(),
            Some("Ensure you entered the correct bucket path.")
        );
    }

    #[tokio::test]
    async fn test_empty_run_writes_marker_only() {
        let (storage, factory) = factory();
        let summary = GcsBatchSink::new(config("gs://out/empty", "parquet"))
            .run(&factory, &RunContext::new(), Vec::new())
            .await
            .unwrap();
        assert!(summary.files.is_empty());
        assert_eq!(
            storage.object_names("out").await.unwrap(),
            vec!["empty/_SUCCESS"]
        );
    }
}
