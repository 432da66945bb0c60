// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `GCSCopy` and `GCSMove`.

use std::fmt;

use async_trait::async_trait;
use gcsfs::transfer::{self, ObjectPair, TransferMode};
use gcsfs::{FileSystem, StorageFactory};

use super::Action;
use super::source_dest::SourceDestConfig;
use crate::collector::FailureCollector;
use crate::context::RunContext;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub pairs: Vec<ObjectPair>,
}

impl TransferSummary {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} objects transferred", self.pairs.len())?;
        for pair in &self.pairs {
            write!(f, "\n  {} -> {}", pair.source, pair.destination)?;
        }
        Ok(())
    }
}

/// Copies or moves an object or directory.
pub struct GcsTransfer {
    mode: TransferMode,
    config: SourceDestConfig,
}

impl GcsTransfer {
    pub const COPY: &'static str = "GCSCopy";
    pub const MOVE: &'static str = "GCSMove";

    pub fn copy(config: SourceDestConfig) -> Self {
        Self {
            mode: TransferMode::Copy,
            config,
        }
    }

    pub fn moving(config: SourceDestConfig) -> Self {
        Self {
            mode: TransferMode::Move,
            config,
        }
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn config(&self) -> &SourceDestConfig {
        &self.config
    }

    fn gauge(&self) -> &'static str {
        match self.mode {
            TransferMode::Copy => "gc.file.copy.count",
            TransferMode::Move => "gc.file.move.count",
        }
    }
}

#[async_trait]
impl Action for GcsTransfer {
    type Summary = TransferSummary;

    fn name(&self) -> &'static str {
        match self.mode {
            TransferMode::Copy => Self::COPY,
            TransferMode::Move => Self::MOVE,
        }
    }

    async fn configure_pipeline(&self, factory: &dyn StorageFactory) -> Result<()> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await
    }

    async fn run(
        &self,
        factory: &dyn StorageFactory,
        context: &RunContext,
    ) -> Result<TransferSummary> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await?;

        let storage = self.config.gcp.connect_or_error(factory)?;
        let source = self.config.source()?;
        let destination = self.config.destination()?;
        let options = self.config.transfer_options();

        let fs = FileSystem::get(&source, storage)?;
        let pairs = transfer::plan(&fs, &source, &destination, options).await?;
        context.metrics().gauge(self.gauge(), pairs.len() as i64);

        let count = transfer::execute(&fs, &pairs, self.mode, options.overwrite).await?;
        let name = self.name();
        let source = source.to_string();
        let destination = destination.to_string();
        diagnostics::info!("{name} transferred {count} objects from {source} to {destination}", name: name, count: count, source: source, destination: destination);

        Ok(TransferSummary { pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcpConfig;
    use crate::context::RecordingSink;
    use crate::error::PluginError;
    use gcsfs::{MemoryStorage, MemoryStorageFactory, StorageError};
    use std::sync::Arc;

    fn config(source: &str, dest: &str, recursive: bool, overwrite: bool) -> SourceDestConfig {
        SourceDestConfig {
            gcp: GcpConfig {
                project: Some("p".to_string()),
                service_file_path: None,
            },
            source_path: source.to_string(),
            dest_path: dest.to_string(),
            overwrite: Some(overwrite),
            recursive: Some(recursive),
        }
    }

    async fn setup() -> (Arc<MemoryStorage>, MemoryStorageFactory) {
        let storage = Arc::new(MemoryStorage::new("p").with_bucket("src").with_bucket("dst"));
        for name in ["gs://src/dir/a.json", "gs://src/dir/b.json", "gs://src/one.json"] {
            storage.put_object(name, name.to_string()).await.unwrap();
        }
        (storage.clone(), MemoryStorageFactory::new(storage))
    }

    #[tokio::test]
    async fn test_copy_directory() {
        let (storage, factory) = setup().await;
        let sink = Arc::new(RecordingSink::new());
        let action = GcsTransfer::copy(config("gs://src/dir", "gs://dst/copied", true, false));
        assert_eq!(action.name(), "GCSCopy");

        let summary = action
            .run(&factory, &RunContext::recording(sink.clone()))
            .await
            .unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(sink.gauge_value("gc.file.copy.count"), Some(2));
        assert_eq!(
            storage.object_names("dst").await.unwrap(),
            vec!["copied/a.json", "copied/b.json"]
        );
        assert_eq!(storage.object_names("src").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_move_object() {
        let (storage, factory) = setup().await;
        let sink = Arc::new(RecordingSink::new());
        let action = GcsTransfer::moving(config("gs://src/one.json", "gs://dst", false, false));
        let summary = action
            .run(&factory, &RunContext::recording(sink.clone()))
            .await
            .unwrap();
        assert_eq!(summary.to_string(), "1 objects transferred\n  gs://src/one.json -> gs://dst/one.json");
        assert_eq!(sink.gauge_value("gc.file.move.count"), Some(1));
        assert_eq!(storage.object_names("dst").await.unwrap(), vec!["one.json"]);
        assert_eq!(
            storage.object_names("src").await.unwrap(),
            vec!["dir/a.json", "dir/b.json"]
        );
    }

    #[tokio::test]
    async fn test_copy_without_overwrite_leaves_destination() {
        let (storage, factory) = setup().await;
        storage.put_object("gs://dst/out/dir/b.json", "keep").await.unwrap();

        let action = GcsTransfer::copy(config("gs://src/dir", "gs://dst/out/", true, false));
        let err = action.run(&factory, &RunContext::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PluginError::Storage(StorageError::AlreadyExists(_))
        ));
        assert_eq!(storage.object_names("dst").await.unwrap(), vec!["out/dir/b.json"]);
    }

    #[tokio::test]
    async fn test_directory_needs_recursive() {
        let (_, factory) = setup().await;
        let action = GcsTransfer::copy(config("gs://src/dir", "gs://dst/x", false, false));
        let err = action.run(&factory, &RunContext::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Path 'gs://src/dir' is a directory. Set 'recursive' to true to copy or move directories."
        );
    }

    #[tokio::test]
    async fn test_missing_destination_bucket_fails_validation() {
        let (_, factory) = setup().await;
        let action = GcsTransfer::copy(config("gs://src/one.json", "gs://nobucket/x", false, false));
        let err = action.configure_pipeline(&factory).await.unwrap_err();
        assert!(err.validation().is_some());
    }
}
