// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `GCSBucketDelete`: best-effort deletion of a list of paths.

use std::fmt;

use async_trait::async_trait;
use gcsfs::{FileSystem, GcsPath, StorageFactory};
use serde::{Deserialize, Serialize};

use super::Action;

use crate::collector::FailureCollector;
use crate::config::{Attach, CORRECT_BUCKET_PATH, GcpConfig, check_path, contains_macro};
use crate::context::RunContext;
use crate::error::Result;

pub const NAME_PATHS: &str = "paths";

const DELETE_COUNT: &str = "gc.file.delete.count";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfig {
    #[serde(flatten)]
    pub gcp: GcpConfig,
    /// Comma separated list of objects to delete.
    pub paths: String,
}

impl DeleteConfig {
    /// Entries of `paths`, trimmed. Trailing empty entries are dropped.
    pub fn paths(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .paths
            .split(',')
            .map(|entry| entry.trim().to_string())
            .collect();
        while entries.len() > 1 && entries.last().is_some_and(|e| e.is_empty()) {
            entries.pop();
        }
        entries
    }

    /// Check every path and its bucket. Each failure names the entry it
    /// concerns.
    pub async fn validate(
        &self,
        factory: &dyn StorageFactory,
        collector: &mut FailureCollector,
    ) -> Result<()> {
        if contains_macro(Some(&self.paths)) {
            return Ok(());
        }
        let storage = self.gcp.connect(factory, collector);
        for path in self.paths() {
            check_path(
                &path,
                Attach::Element(NAME_PATHS),
                storage.as_ref(),
                Some(CORRECT_BUCKET_PATH),
                CORRECT_BUCKET_PATH,
                collector,
            )
            .await;
        }
        collector.get_or_error()?;
        Ok(())
    }
}

/// What happened to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Removed, with the number of objects deleted.
    Deleted(usize),
    NotFound,
    /// No file system handle could be resolved.
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    pub path: GcsPath,
    pub status: DeleteStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub outcomes: Vec<PathOutcome>,
}

impl DeleteSummary {
    pub fn deleted(&self) -> usize {
        self.count(|s| matches!(s, DeleteStatus::Deleted(_)))
    }

    pub fn not_found(&self) -> usize {
        self.count(|s| matches!(s, DeleteStatus::NotFound))
    }

    /// Paths skipped or failed.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DeleteStatus::Skipped(_) | DeleteStatus::Failed(_)))
    }

    fn count(&self, f: impl Fn(&DeleteStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}

impl fmt::Display for DeleteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deleted, {} not found, {} failed",
            self.deleted(),
            self.not_found(),
            self.failed()
        )
    }
}

pub struct GcsBucketDelete {
    config: DeleteConfig,
}

impl GcsBucketDelete {
    pub const NAME: &'static str = "GCSBucketDelete";

    pub fn new(config: DeleteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeleteConfig {
        &self.config
    }
}

#[async_trait]
impl Action for GcsBucketDelete {
    type Summary = DeleteSummary;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn configure_pipeline(&self, factory: &dyn StorageFactory) -> Result<()> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await
    }

    /// Delete every configured path, continuing past failures.
    async fn run(&self, factory: &dyn StorageFactory, context: &RunContext) -> Result<DeleteSummary> {
        let mut collector = FailureCollector::new();
        self.config.validate(factory, &mut collector).await?;

        let storage = self.config.gcp.connect_or_error(factory)?;
        let paths = self
            .config
            .paths()
            .iter()
            .map(|p| GcsPath::parse(p))
            .collect::<gcsfs::Result<Vec<_>>>()?;

        context.metrics().gauge(DELETE_COUNT, paths.len() as i64);

        let mut summary = DeleteSummary::default();
        for path in &paths {
            // The handle is resolved from the first path for every entry
            let status = match FileSystem::get(&paths[0], storage.clone()) {
                Err(e) => {
                    let reason = e.to_string();
                    let name = path.name();
                    diagnostics::info!("Failed deleting file {name}, {reason}", name: name, reason: reason);
                    DeleteStatus::Skipped(reason)
                }
                Ok(fs) => delete_one(&fs, path).await,
            };
            summary.outcomes.push(PathOutcome {
                path: path.clone(),
                status,
            });
        }

        diagnostics::info!("Delete finished: {summary}", summary: summary.to_string());
        Ok(summary)
    }
}

async fn delete_one(fs: &FileSystem, path: &GcsPath) -> DeleteStatus {
    let outcome = match fs.exists(path).await {
        Ok(false) => return DeleteStatus::NotFound,
        Ok(true) => fs.delete(path, true).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(count) => {
            let uri = path.to_string();
            diagnostics::debug!("Deleted {count} objects at {uri}", count: count, uri: uri);
            DeleteStatus::Deleted(count)
        }
        Err(e) => {
            let uri = path.to_string();
            diagnostics::warn!("Failed to delete path '{uri}'", uri: uri);
            DeleteStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordingSink;
    use gcsfs::{MemoryStorage, MemoryStorageFactory};
    use std::sync::Arc;

    fn config(paths: &str) -> DeleteConfig {
        DeleteConfig {
            gcp: GcpConfig {
                project: Some("test-project".to_string()),
                service_file_path: None,
            },
            paths: paths.to_string(),
        }
    }

    async fn setup() -> (Arc<MemoryStorage>, MemoryStorageFactory) {
        let storage = Arc::new(MemoryStorage::new("test-project").with_bucket("a").with_bucket("b"));
        for name in ["gs://a/x/1.txt", "gs://a/x/2.txt", "gs://a/y.txt", "gs://b/z.txt"] {
            storage.put_object(name, "data").await.unwrap();
        }
        let factory = MemoryStorageFactory::new(storage.clone());
        (storage, factory)
    }

    #[test]
    fn test_paths_split() {
        assert_eq!(config(" gs://a/x , gs://b/y").paths(), vec!["gs://a/x", "gs://b/y"]);
        assert_eq!(config("gs://a/x,,gs://b").paths(), vec!["gs://a/x", "", "gs://b"]);
        assert_eq!(config("gs://a/x,").paths(), vec!["gs://a/x"]);
        assert_eq!(config("").paths(), vec![""]);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = "project: p\nserviceFilePath: auto-detect\npaths: gs://a/x,gs://b/y\n";
        let config: DeleteConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.gcp.project.as_deref(), Some("p"));
        assert_eq!(config.gcp.service_account_file_path(), None);
        assert_eq!(config.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_validate_attributes_failures_to_entries() {
        let (_, factory) = setup().await;
        let mut collector = FailureCollector::new();
        let err = config("gs://a/x, gs://missing/q, gs://Bad")
            .validate(&factory, &mut collector)
            .await
            .unwrap_err();
        let failures = err.validation().unwrap().failures();
        assert_eq!(failures.len(), 2);

        assert_eq!(failures[0].message(), "Bucket does not exist.");
        assert_eq!(
            failures[0].corrective_action(),
            Some("Ensure you entered the correct bucket path.")
        );
        assert_eq!(
            failures[0].causes()[0],
            crate::collector::Cause::ConfigElement {
                property: NAME_PATHS.to_string(),
                element: "gs://missing/q".to_string(),
            }
        );
        assert!(failures[1].message().starts_with("Invalid bucket name"));
    }

    #[tokio::test]
    async fn test_validate_skips_macros() {
        let (storage, factory) = setup().await;
        let mut collector = FailureCollector::new();
        config("gs://${bucket}/x")
            .validate(&factory, &mut collector)
            .await
            .unwrap();
        assert!(storage.connections().is_empty());
    }

    #[tokio::test]
    async fn test_run_deletes_and_reports() {
        let (storage, factory) = setup().await;
        let sink = Arc::new(RecordingSink::new());
        let context = RunContext::recording(sink.clone());

        let action = GcsBucketDelete::new(config("gs://a/x, gs://a/nothing, gs://b/z.txt"));
        let summary = action.run(&factory, &context).await.unwrap();

        let statuses: Vec<&DeleteStatus> = summary.outcomes.iter().map(|o| &o.status).collect();
        assert_eq!(
            statuses,
            vec![
                &DeleteStatus::Deleted(2),
                &DeleteStatus::NotFound,
                &DeleteStatus::Deleted(1)
            ]
        );
        assert_eq!(summary.to_string(), "2 deleted, 1 not found, 0 failed");
        assert_eq!(sink.gauge_value(DELETE_COUNT), Some(3));
        assert_eq!(storage.object_names("a").await.unwrap(), vec!["y.txt"]);
        assert!(storage.object_names("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_continues_when_handle_lookup_fails() {
        let (storage, factory) = setup().await;
        let action = GcsBucketDelete::new(config("gs://a/y.txt, gs://b/z.txt"));
        action.configure_pipeline(&factory).await.unwrap();

        storage.make_unreachable("a");
        let summary = action.run(&factory, &RunContext::new()).await.unwrap();

        // Every entry resolves its handle through the first path
        assert_eq!(summary.outcomes.len(), 2);
        assert!(
            summary
                .outcomes
                .iter()
                .all(|o| matches!(o.status, DeleteStatus::Skipped(_)))
        );
        assert_eq!(storage.object_names("b").await.unwrap(), vec!["z.txt"]);
        assert_eq!(summary.failed(), 2);
    }

    #[tokio::test]
    async fn test_run_records_delete_failures() {
        let (storage, factory) = setup().await;
        let action = GcsBucketDelete::new(config("gs://b/z.txt, gs://a/y.txt"));
        storage.make_unreachable("a");

        let summary = action.run(&factory, &RunContext::new()).await.unwrap();
        assert_eq!(summary.outcomes[0].status, DeleteStatus::Deleted(1));
        assert!(matches!(summary.outcomes[1].status, DeleteStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_run_aborts_on_validation_failure() {
        let (storage, factory) = setup().await;
        let action = GcsBucketDelete::new(config("gs://a/y.txt, gs://missing/z"));
        let err = action.run(&factory, &RunContext::new()).await.unwrap_err();
        assert!(err.validation().is_some());
        assert_eq!(storage.object_names("a").await.unwrap().len(), 3);
    }
}
