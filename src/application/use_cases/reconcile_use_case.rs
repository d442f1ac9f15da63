// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::use_cases::monitor_use_case::pages_path_for;
use crate::config::settings::RuntimeOptions;
use crate::domain::models::report::Report;
use crate::domain::models::summary::RunSummary;
use crate::domain::repositories::archive_source::ArchiveProvider;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::reconcile_service::{ReconcileRun, ReconcileService};
use crate::domain::services::report_service::ReportService;
use crate::infrastructure::metadata::{self, MetadataError};
use crate::infrastructure::report_writer;

#[derive(Error, Debug)]
pub enum ReconcileUseCaseError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// 对账流程的产出
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub run: ReconcileRun,
    pub report: Report,
    pub report_files: Vec<String>,
    /// 回填后的元数据文件
    pub metadata_path: PathBuf,
}

/// 对账：元数据 + 批量归档 → 回填的版本记录 → 报告
pub struct ReconcileUseCase {
    reconcile: ReconcileService,
    report: ReportService,
    provider: Arc<dyn ArchiveProvider>,
    storage: Arc<dyn StorageRepository>,
    summary: Arc<RunSummary>,
    metadata_path: PathBuf,
}

impl ReconcileUseCase {
    pub fn new(
        provider: Arc<dyn ArchiveProvider>,
        storage: Arc<dyn StorageRepository>,
        options: &RuntimeOptions,
    ) -> Self {
        let summary = Arc::new(RunSummary::new());
        Self {
            reconcile: ReconcileService::new(
                storage.clone(),
                summary.clone(),
                options.reconcile.clone(),
            ),
            report: ReportService::new(options.report.clone()),
            provider,
            storage,
            summary,
            metadata_path: options.metadata_path.clone(),
        }
    }

    pub fn summary(&self) -> &Arc<RunSummary> {
        &self.summary
    }

    pub async fn run(
        &self,
        report_time: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileUseCaseError> {
        info!(
            run_id = %self.summary.run_id(),
            metadata = %self.metadata_path.display(),
            "Starting reconcile run"
        );

        let versions = metadata::read_versions(&self.metadata_path).await?;
        self.summary.record_versions(versions.len());
        let mut groups = metadata::group_by_page(versions);
        self.summary.record_pages(groups.len());

        let run = self
            .reconcile
            .reconcile_all(&mut groups, self.provider.as_ref())
            .await;

        let output = self.metadata_path.with_extension("reconciled.jsonl");
        metadata::write_versions(&output, groups.values().flatten()).await?;

        let contexts = metadata::read_pages(&pages_path_for(&self.metadata_path)).await?;
        if contexts.is_empty() {
            warn!("No page context found, report will be empty");
        }
        let records = metadata::rebuild_records(contexts, groups);
        let report = self.report.build_report(&records, report_time);
        let report_files =
            report_writer::write_report(self.storage.as_ref(), "reports", &report).await?;

        info!(
            pages = run.pages.len(),
            failed_pages = run.failures.len(),
            "Reconcile run finished"
        );
        self.summary.log();

        Ok(ReconcileOutcome {
            run,
            report,
            report_files,
            metadata_path: output,
        })
    }
}
