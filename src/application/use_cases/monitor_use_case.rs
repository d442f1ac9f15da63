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
use tracing::info;

use crate::config::settings::RuntimeOptions;
use crate::domain::models::page_record::PageRecord;
use crate::domain::models::report::Report;
use crate::domain::models::summary::RunSummary;
use crate::domain::repositories::change_source::ChangeSource;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::capture_service::CaptureService;
use crate::domain::services::report_service::ReportService;
use crate::domain::services::scrape_service::ScrapeService;
use crate::engines::governor::RequestGovernor;
use crate::infrastructure::metadata::{self, MetadataError};
use crate::infrastructure::report_writer;
use crate::utils::errors::SourceError;

#[derive(Error, Debug)]
pub enum MonitorUseCaseError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// 在线流程的产出
#[derive(Debug)]
pub struct MonitorOutcome {
    pub records: Vec<PageRecord>,
    pub report: Report,
    pub report_files: Vec<String>,
}

/// 页面上下文文件与版本元数据放在同一目录
pub fn pages_path_for(metadata_path: &std::path::Path) -> PathBuf {
    metadata_path.with_file_name("pages.jsonl")
}

/// 在线监控：编排 → 抓取 → 元数据 → 报告
pub struct MonitorUseCase<S: ChangeSource> {
    scrape: ScrapeService<S>,
    capture: CaptureService<S>,
    report: ReportService,
    storage: Arc<dyn StorageRepository>,
    summary: Arc<RunSummary>,
    governor: Arc<RequestGovernor>,
    metadata_path: PathBuf,
}

impl<S: ChangeSource> MonitorUseCase<S> {
    pub fn new(
        source: Arc<S>,
        storage: Arc<dyn StorageRepository>,
        options: &RuntimeOptions,
    ) -> Self {
        let summary = Arc::new(RunSummary::new());
        let governor = Arc::new(RequestGovernor::new(
            options.governor.clone(),
            options.retry.clone(),
        ));
        let capture_storage = (options.capture.save_content || options.capture.save_diffs)
            .then(|| storage.clone());

        Self {
            scrape: ScrapeService::new(
                source.clone(),
                governor.clone(),
                summary.clone(),
                options.scrape.clone(),
            ),
            capture: CaptureService::new(
                source,
                governor.clone(),
                capture_storage,
                summary.clone(),
                options.capture.clone(),
            ),
            report: ReportService::new(options.report.clone()),
            storage,
            summary,
            governor,
            metadata_path: options.metadata_path.clone(),
        }
    }

    pub fn summary(&self) -> &Arc<RunSummary> {
        &self.summary
    }

    pub fn governor(&self) -> &Arc<RequestGovernor> {
        &self.governor
    }

    pub async fn run(
        &self,
        report_time: DateTime<Utc>,
    ) -> Result<MonitorOutcome, MonitorUseCaseError> {
        info!(run_id = %self.summary.run_id(), "Starting monitor run");

        // 1. 遍历站点、页面与版本
        let mut records = self.scrape.scrape().await?;

        // 2. 抓取内容与差异，失败项只记录
        self.capture.capture_records(&mut records).await;

        // 3. 写出元数据，供之后的对账使用
        metadata::write_versions(
            &self.metadata_path,
            records.iter().flat_map(|r| r.all_versions()),
        )
        .await?;
        metadata::write_pages(&pages_path_for(&self.metadata_path), &records).await?;

        // 4. 生成报告
        let report = self.report.build_report(&records, report_time);
        let report_files =
            report_writer::write_report(self.storage.as_ref(), "reports", &report).await?;

        info!(
            requests = self.governor.requests_issued(),
            groups = report.groups.len(),
            rows = report.total_rows(),
            "Monitor run finished"
        );
        self.summary.log();

        Ok(MonitorOutcome {
            records,
            report,
            report_files,
        })
    }
}
