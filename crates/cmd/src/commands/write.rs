// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::RecordBatch;
use arrow_schema::{FieldRef, Schema, SchemaRef};
use gcsfs::StorageFactory;
use plugins::{GcsBatchSink, GcsSinkConfig, RunContext, SinkSummary};

use crate::common::load_config;

const INFER_RECORDS: usize = 1000;

/// Read a CSV file with a header row into record batches.
///
/// Columns follow the header. A column named in `schema` with a flat type
/// is read with that type; other columns are inferred. The sink then selects
/// and converts columns by name.
pub fn read_csv(path: &Path, schema: Option<SchemaRef>) -> Result<Vec<RecordBatch>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;

    let format = arrow_csv::reader::Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(&mut file, Some(INFER_RECORDS))
        .with_context(|| format!("Failed to infer schema of {}", path.display()))?;
    let _ = file.seek(SeekFrom::Start(0))?;

    let fields: Vec<FieldRef> = inferred
        .fields()
        .iter()
        .map(|column| {
            schema
                .as_ref()
                .and_then(|s| s.field_with_name(column.name()).ok())
                .filter(|configured| !configured.data_type().is_nested())
                .map_or_else(|| column.clone(), |configured| Arc::new(configured.clone()))
        })
        .collect();

    let reader = arrow_csv::ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_header(true)
        .build(file)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    reader
        .map(|batch| batch.with_context(|| format!("Failed to parse {}", path.display())))
        .collect()
}

/// Run the `GCS` sink over the rows of a CSV file.
pub async fn write_command<F>(
    factory: &dyn StorageFactory,
    context: &RunContext,
    config_path: &Path,
    input: &Path,
    mut output: F,
) -> Result<SinkSummary>
where
    F: FnMut(String),
{
    let config: GcsSinkConfig = load_config(config_path)?;
    let schema = config.parsed_schema()?;
    let batches = read_csv(input, schema)?;
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let source = input.display().to_string();
    diagnostics::debug!("Read {rows} rows from {source}", rows: rows, source: source);

    let sink = GcsBatchSink::new(config);
    let summary = sink
        .run(factory, context, batches)
        .await
        .with_context(|| format!("{} sink failed", GcsBatchSink::NAME))?;

    for file in &summary.files {
        output(format!("{}\n", file));
    }
    output(format!(
        "Wrote {} records to {}\n",
        summary.records, summary.output
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use arrow_schema::{DataType, Field, Schema};

    #[test]
    fn test_read_csv_inferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "id,name\n1,a\n2,b\n").unwrap();

        let batches = read_csv(&path, None).unwrap();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 2);

        let schema = batches[0].schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_read_csv_with_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "id,code\n1,007\n").unwrap();

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("code", DataType::Utf8, true),
        ]));
        let batches = read_csv(&path, Some(schema)).unwrap();
        let batch = &batches[0];
        assert_eq!(batch.column(0).as_primitive::<Int64Type>().value(0), 1);
        assert_eq!(batch.column(1).as_string::<i32>().value(0), "007");
    }

    #[test]
    fn test_read_csv_follows_header_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "name,code\nalice,007\n").unwrap();

        let schema = Arc::new(Schema::new(vec![
            Field::new("code", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batches = read_csv(&path, Some(schema)).unwrap();
        let batch = &batches[0];
        let column = |name: &str| {
            batch
                .column_by_name(name)
                .unwrap()
                .as_string::<i32>()
                .value(0)
                .to_string()
        };
        assert_eq!(column("name"), "alice");
        assert_eq!(column("code"), "007");
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/nonexistent/rows.csv"), None).unwrap_err();
        assert!(err.to_string().contains("Failed to open input"));
    }
}
