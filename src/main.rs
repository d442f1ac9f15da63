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

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};

use versionwatch::application::use_cases::monitor_use_case::MonitorUseCase;
use versionwatch::application::use_cases::reconcile_use_case::ReconcileUseCase;
use versionwatch::config::settings::{RunMode, Settings};
use versionwatch::domain::repositories::storage_repository::StorageRepository;
use versionwatch::engines::http_source::HttpChangeSource;
use versionwatch::infrastructure::archive::DirectoryArchiveProvider;
use versionwatch::infrastructure::storage::LocalStorage;
use versionwatch::utils::telemetry;

/// 主函数
///
/// 配置错误在任何网络请求之前终止进程并返回非零退出码
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration and initialize logging
    let settings = Settings::new();
    telemetry::init_telemetry(settings.as_ref().is_ok_and(|s| s.log_json));
    info!("Starting versionwatch...");

    // 2. Validate configuration
    let options = match settings.and_then(Settings::into_options) {
        Ok(options) => options,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e).context("failed to load configuration");
        }
    };
    info!(mode = ?options.mode, output = %options.output_dir.display(), "Configuration loaded");

    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(&options.output_dir));
    let report_time = Utc::now();

    // 3. Run
    match options.mode {
        RunMode::Monitor => {
            let token = options.api_token.as_deref().unwrap_or_default();
            let source = Arc::new(HttpChangeSource::new(
                &options.base_url,
                token,
                options.request_timeout,
            )?);
            let outcome = MonitorUseCase::new(source, storage, &options)
                .run(report_time)
                .await?;
            info!(
                pages = outcome.records.len(),
                reports = outcome.report_files.len(),
                "Done"
            );
        }
        RunMode::Reconcile => {
            let provider = Arc::new(DirectoryArchiveProvider::new(&options.archive_dir));
            let outcome = ReconcileUseCase::new(provider, storage, &options)
                .run(report_time)
                .await?;
            info!(
                reconciled = outcome.run.pages.len(),
                failed = outcome.run.failures.len(),
                metadata = %outcome.metadata_path.display(),
                "Done"
            );
        }
    }

    Ok(())
}
