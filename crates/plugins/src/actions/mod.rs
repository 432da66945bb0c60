// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Pipeline actions: one storage operation run between pipeline stages.

use std::fmt;

use async_trait::async_trait;
use gcsfs::StorageFactory;

use crate::context::RunContext;
use crate::error::Result;

pub mod delete;
pub mod source_dest;
pub mod transfer;

pub use delete::{DeleteConfig, DeleteStatus, DeleteSummary, GcsBucketDelete, PathOutcome};
pub use source_dest::SourceDestConfig;
pub use transfer::{GcsTransfer, TransferSummary};

#[async_trait]
pub trait Action: Send + Sync {
    /// What a successful run reports.
    type Summary: fmt::Display + Send;

    /// Plugin name as registered with the pipeline.
    fn name(&self) -> &'static str;

    /// Validate the configuration at deployment time.
    async fn configure_pipeline(&self, factory: &dyn StorageFactory) -> Result<()>;

    /// Validate again and perform the operation.
    async fn run(&self, factory: &dyn StorageFactory, context: &RunContext)
    -> Result<Self::Summary>;
}
