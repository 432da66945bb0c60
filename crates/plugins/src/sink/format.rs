// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Output file formats and their encoders.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use arrow_array::RecordBatch;
use arrow_avro::writer::WriterBuilder as AvroWriterBuilder;
use arrow_avro::writer::format::AvroOcfFormat;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::error::{PluginError, Result};

/// Delimiter used by `delimited` when none is configured.
pub const DEFAULT_DELIMITER: u8 = b',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Json,
    Avro,
    Parquet,
    Csv,
    Tsv,
    Delimited,
}

impl FileFormat {
    pub const ALL: [FileFormat; 6] = [
        FileFormat::Json,
        FileFormat::Avro,
        FileFormat::Parquet,
        FileFormat::Csv,
        FileFormat::Tsv,
        FileFormat::Delimited,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Avro => "avro",
            FileFormat::Parquet => "parquet",
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Delimited => "delimited",
        }
    }

    /// File name extension of written part files.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Delimited => "txt",
            other => other.name(),
        }
    }

    /// Field separator of the text formats.
    fn separator(&self, delimiter: u8) -> u8 {
        match self {
            FileFormat::Tsv => b'\t',
            FileFormat::Delimited => delimiter,
            _ => b',',
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(FileFormat::name).collect();
                PluginError::InvalidFormat(format!(
                    "Invalid format '{}'. The value must be one of {}.",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// The configured delimiter as a byte; absent or empty selects `,`.
pub fn parse_delimiter(delimiter: Option<&str>) -> Result<u8> {
    let Some(value) = delimiter.filter(|d| !d.is_empty()) else {
        return Ok(DEFAULT_DELIMITER);
    };
    let value = match value {
        "\\t" => "\t",
        other => other,
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(PluginError::InvalidDelimiter(value.to_string())),
    }
}

/// Encode `batches` as one file.
pub fn encode(
    format: FileFormat,
    delimiter: u8,
    schema: SchemaRef,
    batches: &[RecordBatch],
) -> Result<Bytes> {
    let mut buffer = Vec::new();
    match format {
        FileFormat::Json => {
            let mut writer = arrow_json::LineDelimitedWriter::new(&mut buffer);
            for batch in batches {
                writer.write(batch)?;
            }
            writer.finish()?;
        }
        FileFormat::Avro => {
            let mut writer = AvroWriterBuilder::new(schema.as_ref().clone())
                .build::<_, AvroOcfFormat>(&mut buffer)?;
            for batch in batches {
                writer.write(batch)?;
            }
            writer.finish()?;
        }
        FileFormat::Parquet => {
            let cursor = Cursor::new(&mut buffer);
            let props = WriterProperties::builder().build();
            let mut writer = ArrowWriter::try_new(cursor, schema, Some(props))?;
            for batch in batches {
                writer.write(batch)?;
            }
            let _ = writer.close()?;
        }
        FileFormat::Csv | FileFormat::Tsv | FileFormat::Delimited => {
            let mut writer = arrow_csv::WriterBuilder::new()
                .with_header(false)
                .with_delimiter(format.separator(delimiter))
                .build(&mut buffer);
            for batch in batches {
                writer.write(batch)?;
            }
        }
    }
    Ok(Bytes::from(buffer))
}
