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

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::models::page_record::PageRecord;
use crate::domain::models::summary::RunSummary;
use crate::domain::models::version::{ContentResult, DiffKind, DiffResult, Version};
use crate::domain::repositories::change_source::ChangeSource;
use crate::domain::repositories::storage_repository::StorageRepository;
use crate::engines::governor::RequestGovernor;
use crate::utils::errors::{CaptureError, CaptureKind, SourceError};
use crate::utils::hashing;

/// 抓取引擎配置
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// 差异优先使用"安全"地址（相对上一个非错误版本）
    pub skip_error_versions: bool,
    /// 是否抓取原始内容
    pub fetch_content: bool,
    /// 需要抓取的差异种类
    pub diff_kinds: Vec<DiffKind>,
    /// 是否保存原始内容
    pub save_content: bool,
    /// 是否保存差异
    pub save_diffs: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            skip_error_versions: false,
            fetch_content: true,
            diff_kinds: vec![DiffKind::Full, DiffKind::Text],
            save_content: false,
            save_diffs: false,
        }
    }
}

/// 单个版本的抓取结果
#[derive(Debug, Clone, Default)]
pub struct VersionCapture {
    pub content: Option<ContentResult>,
    pub diffs: Vec<DiffResult>,
}

impl VersionCapture {
    pub fn apply_to(&self, version: &mut Version) {
        if let Some(content) = &self.content {
            version.apply_content(content);
        }
        for diff in &self.diffs {
            version.apply_diff(diff);
        }
    }
}

/// 抓取引擎
///
/// 所有请求都经过 [`RequestGovernor`]；单个版本失败只记录不终止批次
pub struct CaptureService<S: ChangeSource> {
    source: Arc<S>,
    governor: Arc<RequestGovernor>,
    storage: Option<Arc<dyn StorageRepository>>,
    summary: Arc<RunSummary>,
    options: CaptureOptions,
}

impl<S: ChangeSource> CaptureService<S> {
    pub fn new(
        source: Arc<S>,
        governor: Arc<RequestGovernor>,
        storage: Option<Arc<dyn StorageRepository>>,
        summary: Arc<RunSummary>,
        options: CaptureOptions,
    ) -> Self {
        Self {
            source,
            governor,
            storage,
            summary,
            options,
        }
    }

    /// 选择差异地址，跳过错误版本模式下优先安全地址
    pub fn resolve_diff_url<'a>(&self, version: &'a Version) -> Option<&'a str> {
        let preferred = if self.options.skip_error_versions {
            version.diff_safe_url.as_deref().or(version.diff_url.as_deref())
        } else {
            version.diff_url.as_deref()
        };
        preferred.filter(|url| !url.trim().is_empty())
    }

    /// 资源已消失时返回 None
    async fn fetch(
        &self,
        version: &Version,
        kind: CaptureKind,
        url: &str,
    ) -> Result<Option<bytes::Bytes>, CaptureError> {
        let source = self.source.as_ref();
        let result = self
            .governor
            .execute(url, || async move {
                match kind {
                    CaptureKind::Content => source.fetch_content(url).await,
                    CaptureKind::Diff(diff_kind) => source.fetch_diff(url, diff_kind).await,
                }
            })
            .await;

        match result {
            Ok(body) => Ok(Some(body)),
            Err(SourceError::Gone(_)) => {
                debug!(
                    version_id = %version.id,
                    url = %url,
                    kind = kind.as_str(),
                    "Resource no longer exists"
                );
                self.summary.record_gone();
                Ok(None)
            }
            Err(e) => Err(CaptureError::fetch(&version.id, kind, url, e)),
        }
    }

    async fn persist(
        &self,
        version: &Version,
        kind: CaptureKind,
        extension: &str,
        data: &[u8],
    ) -> Result<Option<String>, CaptureError> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        storage
            .save(&version.storage_key(extension), data)
            .await
            .map(Some)
            .map_err(|source| CaptureError::Storage {
                version_id: version.id.clone(),
                kind: kind.as_str(),
                source,
            })
    }

    /// 抓取原始内容
    pub async fn capture_content(
        &self,
        version: &Version,
    ) -> Result<Option<ContentResult>, CaptureError> {
        let Some(url) = version.content_url.as_deref().filter(|_| version.has_content) else {
            return Ok(None);
        };
        let Some(body) = self.fetch(version, CaptureKind::Content, url).await? else {
            return Ok(None);
        };

        let file_path = if self.options.save_content {
            self.persist(version, CaptureKind::Content, "html", &body)
                .await?
        } else {
            None
        };

        Ok(Some(ContentResult {
            hash: hashing::sha256_hex(&body),
            length: body.len() as u64,
            file_path,
        }))
    }

    /// 抓取差异，没有可用地址时为空操作
    pub async fn capture_diff(
        &self,
        version: &Version,
        kind: DiffKind,
    ) -> Result<Option<DiffResult>, CaptureError> {
        let Some(url) = self.resolve_diff_url(version) else {
            return Ok(None);
        };
        let capture_kind = CaptureKind::Diff(kind);
        let Some(body) = self.fetch(version, capture_kind, url).await? else {
            return Ok(None);
        };

        let file_path = if self.options.save_diffs {
            self.persist(version, capture_kind, kind.extension(), &body)
                .await?
        } else {
            None
        };

        Ok(Some(DiffResult {
            kind,
            hash: hashing::sha256_hex(&body),
            length: body.len() as u64,
            file_path,
        }))
    }

    fn record<T>(&self, version: &Version, result: Result<Option<T>, CaptureError>) -> Option<T> {
        match result {
            Ok(Some(value)) => {
                self.summary.record_capture();
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    version_id = %version.id,
                    page_id = %version.page_id,
                    error = %e,
                    "Capture failed"
                );
                self.summary.record_failure(version.id.clone(), e.to_string());
                None
            }
        }
    }

    /// 抓取单个版本的内容与全部差异，三者相互独立并发执行
    pub async fn capture_version(&self, version: &Version) -> VersionCapture {
        let content = async {
            if self.options.fetch_content {
                self.record(version, self.capture_content(version).await)
            } else {
                None
            }
        };
        let diffs = futures::future::join_all(self.options.diff_kinds.iter().map(|kind| async move {
            self.record(version, self.capture_diff(version, *kind).await)
        }));

        let (content, diffs) = tokio::join!(content, diffs);
        VersionCapture {
            content,
            diffs: diffs.into_iter().flatten().collect(),
        }
    }

    /// 并发抓取一批版本，结果按版本ID写回，与完成顺序无关
    pub async fn capture_versions(&self, versions: &mut [Version]) {
        let results = self.capture_many(versions.iter()).await;
        for version in versions.iter_mut() {
            if let Some(capture) = results.get(&(version.page_id.clone(), version.id.clone())) {
                capture.apply_to(version);
            }
        }
    }

    /// 抓取所有页面记录中的版本
    pub async fn capture_records(&self, records: &mut [PageRecord]) {
        let results = self
            .capture_many(records.iter().flat_map(|record| record.all_versions()))
            .await;
        for record in records.iter_mut() {
            for version in record.all_versions_mut() {
                if let Some(capture) = results.get(&(version.page_id.clone(), version.id.clone())) {
                    capture.apply_to(version);
                }
            }
        }
        info!(
            captured = self.summary.captures(),
            failures = self.summary.failure_count(),
            "Capture finished"
        );
    }

    async fn capture_many<'a>(
        &self,
        versions: impl Iterator<Item = &'a Version>,
    ) -> HashMap<(String, String), VersionCapture> {
        // 并发由调度器把关，这里只限制同时挂起的版本数
        let buffer = self.governor.config().max_concurrency.max(1) * 2;
        stream::iter(versions)
            .map(|version| async move {
                let capture = self.capture_version(version).await;
                ((version.page_id.clone(), version.id.clone()), capture)
            })
            .buffer_unordered(buffer)
            .collect()
            .await
    }
}

#[cfg(test)]
#[path = "capture_service_test.rs"]
mod tests;
