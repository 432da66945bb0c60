// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Properties shared by every GCP plugin.

use std::sync::{Arc, LazyLock};

use gcsfs::{Credentials, GcsPath, Storage, StorageError, StorageFactory};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::collector::FailureCollector;

pub const NAME_PROJECT: &str = "project";
pub const NAME_SERVICE_ACCOUNT_FILE_PATH: &str = "serviceFilePath";
pub const NAME_REFERENCE_NAME: &str = "referenceName";

/// Value of `project` or `serviceFilePath` that selects detection from the environment.
pub const AUTO_DETECT: &str = "auto-detect";

pub(crate) const CORRECT_BUCKET_PATH: &str = "Ensure you entered the correct bucket path.";
pub(crate) const CORRECT_FILE_PATH: &str = "Ensure you entered the correct file path.";

static REFERENCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.$-]+$").expect("reference name pattern is valid"));

/// True when a property value holds an unresolved `${...}` macro.
#[must_use]
pub fn contains_macro(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.contains("${"))
}

/// Project and credentials of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpConfig {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub service_file_path: Option<String>,
}

fn explicit(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != AUTO_DETECT && !v.contains("${"))
}

impl GcpConfig {
    /// Key file to authenticate with, or `None` for ambient credentials.
    pub fn service_account_file_path(&self) -> Option<&str> {
        explicit(self.service_file_path.as_deref())
    }

    pub fn load_credentials(&self) -> gcsfs::Result<Option<Credentials>> {
        self.service_account_file_path()
            .map(Credentials::load)
            .transpose()
    }

    /// The configured project, or the detected one.
    pub fn project_id(&self, credentials: Option<&Credentials>) -> gcsfs::Result<String> {
        match explicit(self.project.as_deref()) {
            Some(project) => Ok(project.to_string()),
            None => gcsfs::detect_project(credentials),
        }
    }

    /// Build a storage client, reporting failures to the collector.
    pub fn connect(
        &self,
        factory: &dyn StorageFactory,
        collector: &mut FailureCollector,
    ) -> Option<Arc<dyn Storage>> {
        self.connect_with_action(factory, collector, Some(CORRECT_FILE_PATH))
    }

    /// Like [`GcpConfig::connect`], with `credentials_action` as the
    /// corrective action of a key file that cannot be loaded.
    pub fn connect_with_action(
        &self,
        factory: &dyn StorageFactory,
        collector: &mut FailureCollector,
        credentials_action: Option<&str>,
    ) -> Option<Arc<dyn Storage>> {
        let credentials = match self.load_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                collector
                    .add_failure(e.to_string(), credentials_action)
                    .with_config_property(NAME_SERVICE_ACCOUNT_FILE_PATH)
                    .with_error(&e);
                return None;
            }
        };
        let connected = self
            .project_id(credentials.as_ref())
            .and_then(|project| factory.connect(&project, credentials.as_ref()));
        match connected {
            Ok(storage) => Some(storage),
            Err(e) => {
                collector
                    .add_failure(e.to_string(), None)
                    .with_config_property(NAME_PROJECT)
                    .with_error(&e);
                None
            }
        }
    }

    /// Build a storage client at run time.
    pub fn connect_or_error(&self, factory: &dyn StorageFactory) -> gcsfs::Result<Arc<dyn Storage>> {
        let credentials = self.load_credentials()?;
        let project = self.project_id(credentials.as_ref())?;
        factory.connect(&project, credentials.as_ref())
    }
}

/// Check the lineage reference name of a sink.
pub fn validate_reference_name(reference_name: &str, collector: &mut FailureCollector) {
    if contains_macro(Some(reference_name)) {
        return;
    }
    if !REFERENCE_NAME.is_match(reference_name) {
        collector
            .add_failure(
                format!("Invalid reference name '{}'.", reference_name),
                Some("Supported characters are: letters, numbers, and '_', '-', '.', or '$'."),
            )
            .with_config_property(NAME_REFERENCE_NAME);
    }
}

/// How a missing bucket is reported for one path property.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Attach<'a> {
    Property(&'a str),
    Element(&'a str),
}

/// Parse `raw` and look its bucket up, adding failures to `property`.
///
/// Returns the parsed path when it is syntactically valid. A missing
/// bucket is reported with `missing_bucket_action` when that is set and
/// ignored otherwise; lookup errors are reported with `error_action`.
pub(crate) async fn check_path(
    raw: &str,
    attach: Attach<'_>,
    storage: Option<&Arc<dyn Storage>>,
    missing_bucket_action: Option<&str>,
    error_action: &str,
    collector: &mut FailureCollector,
) -> Option<GcsPath> {
    let attach_to = |collector: &mut FailureCollector, message: String, action: Option<&str>| {
        let failure = collector.add_failure(message, action);
        match attach {
            Attach::Property(property) => failure.with_config_property(property),
            Attach::Element(property) => failure.with_config_element(property, raw),
        };
    };

    let path = match GcsPath::parse(raw) {
        Ok(path) => path,
        Err(e) => {
            attach_to(collector, e.to_string(), None);
            return None;
        }
    };

    if let Some(storage) = storage {
        match storage.get_bucket(path.bucket()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Some(action) = missing_bucket_action {
                    attach_to(collector, "Bucket does not exist.".to_string(), Some(action));
                }
            }
            Err(e) => attach_to(collector, storage_message(&e), Some(error_action)),
        }
    }
    Some(path)
}

/// The service's own message for API errors, the display text otherwise.
fn storage_message(e: &StorageError) -> String {
    match e {
        StorageError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
