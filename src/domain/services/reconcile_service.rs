// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::models::archive::ArchiveEntry;
use crate::domain::models::summary::RunSummary;
use crate::domain::models::version::Version;
use crate::domain::repositories::archive_source::{ArchiveError, ArchiveProvider, ArchiveSource};
use crate::domain::repositories::storage_repository::StorageRepository;
use crate::utils::errors::ReconcileError;
use crate::utils::hashing;

/// 对账配置
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// 时间差必须严格小于该阈值才能匹配
    pub threshold: TimeDelta,
    /// 是否以归档原名保存未匹配的条目
    pub include_unmatched: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            threshold: TimeDelta::minutes(30),
            include_unmatched: false,
        }
    }
}

/// 归档条目与版本的绑定
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub version_id: String,
    pub entry_path: String,
    pub file_path: String,
    pub delta: TimeDelta,
    pub hash: String,
    pub length: u64,
}

/// 单个页面的对账结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReconciliation {
    pub page_id: String,
    pub bindings: Vec<Binding>,
    /// 未绑定任何版本的条目路径
    pub unmatched_entries: Vec<String>,
    /// 以原名保留的未匹配条目的写入位置
    pub retained_files: Vec<String>,
}

/// 整批对账结果
#[derive(Debug, Default)]
pub struct ReconcileRun {
    pub pages: Vec<PageReconciliation>,
    pub failures: Vec<ReconcileError>,
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeDelta {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// 候选版本：按版本ID升序迭代，时间差相同时先遇到的胜出
struct Candidates {
    by_id: BTreeMap<String, (usize, DateTime<Utc>)>,
}

impl Candidates {
    fn new(versions: &[Version]) -> Self {
        let by_id = versions
            .iter()
            .enumerate()
            .filter(|(_, v)| v.has_content && v.file_path.is_none())
            .map(|(index, v)| (v.id.clone(), (index, v.date)))
            .collect();
        Self { by_id }
    }

    /// 选出时间差最小且严格低于阈值的候选并移出集合
    fn take_nearest(
        &mut self,
        timestamp: DateTime<Utc>,
        threshold: TimeDelta,
    ) -> Option<(usize, TimeDelta)> {
        let mut best: Option<(&String, usize, TimeDelta)> = None;
        for (id, &(index, date)) in &self.by_id {
            let delta = distance(timestamp, date);
            if delta >= threshold {
                continue;
            }
            if best.map_or(true, |(_, _, current)| delta < current) {
                best = Some((id, index, delta));
            }
        }

        let (id, index, delta) = best?;
        let id = id.clone();
        self.by_id.remove(&id);
        Some((index, delta))
    }

    fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn remaining(&self) -> Vec<String> {
        self.by_id.keys().cloned().collect()
    }
}

/// 归档对账服务
///
/// 在线贪心地把批量归档条目按时间戳就近映射回版本记录，不回溯，不保证全局最优。
pub struct ReconcileService {
    storage: Arc<dyn StorageRepository>,
    summary: Arc<RunSummary>,
    options: ReconcileOptions,
}

impl ReconcileService {
    pub fn new(
        storage: Arc<dyn StorageRepository>,
        summary: Arc<RunSummary>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            storage,
            summary,
            options,
        }
    }

    fn unmatched_key(&self, versions: &[Version], page_id: &str, entry: &ArchiveEntry) -> String {
        match versions.first() {
            Some(v) => format!("{}/{}/unmatched/{}", v.site_id, page_id, entry.file_name()),
            None => format!("{}/unmatched/{}", page_id, entry.file_name()),
        }
    }

    /// 对账单个页面
    ///
    /// 归档流结束后若仍有候选版本未匹配则整页失败，此时不改动任何版本记录
    #[instrument(skip(self, versions, archive), fields(page_id = %page_id))]
    pub async fn reconcile_page(
        &self,
        page_id: &str,
        versions: &mut [Version],
        archive: &mut dyn ArchiveSource,
    ) -> Result<PageReconciliation, ReconcileError> {
        let mut candidates = Candidates::new(versions);
        let mut result = PageReconciliation {
            page_id: page_id.to_string(),
            ..PageReconciliation::default()
        };
        let mut staged: Vec<(usize, Binding)> = Vec::new();

        while let Some(entry) = archive.next_entry().await? {
            match candidates.take_nearest(entry.timestamp, self.options.threshold) {
                Some((index, delta)) => {
                    let version = &versions[index];
                    let extension = if entry.extension.is_empty() {
                        "html"
                    } else {
                        entry.extension.as_str()
                    };
                    let file_path = self
                        .storage
                        .save(&version.storage_key(extension), &entry.content)
                        .await?;
                    debug!(
                        version_id = %version.id,
                        entry = %entry.path,
                        delta_secs = delta.num_seconds(),
                        "Matched archive entry"
                    );
                    staged.push((
                        index,
                        Binding {
                            version_id: version.id.clone(),
                            entry_path: entry.path.clone(),
                            file_path,
                            delta,
                            hash: hashing::sha256_hex(&entry.content),
                            length: entry.content.len() as u64,
                        },
                    ));
                }
                None if self.options.include_unmatched => {
                    let key = self.unmatched_key(versions, page_id, &entry);
                    let path = self.storage.save(&key, &entry.content).await?;
                    debug!(entry = %entry.path, path = %path, "Kept unmatched archive entry");
                    result.unmatched_entries.push(entry.path);
                    result.retained_files.push(path);
                }
                None => {
                    debug!(entry = %entry.path, "Discarded unmatched archive entry");
                    result.unmatched_entries.push(entry.path);
                }
            }
        }

        let remaining = candidates.remaining();
        if !remaining.is_empty() {
            error!(unmatched = ?remaining, "Archive ended with unmatched versions");
            return Err(ReconcileError::UnmatchedVersions {
                page_id: page_id.to_string(),
                version_ids: remaining,
            });
        }

        for (index, binding) in staged {
            let version = &mut versions[index];
            version.file_path = Some(binding.file_path.clone());
            version.content_hash = Some(binding.hash.clone());
            version.content_length = Some(binding.length);
            result.bindings.push(binding);
        }

        info!(
            bound = result.bindings.len(),
            unmatched_entries = result.unmatched_entries.len(),
            "Page reconciled"
        );
        Ok(result)
    }

    /// 逐页对账整个元数据流
    ///
    /// 页面级失败记录后继续处理其余页面
    pub async fn reconcile_all(
        &self,
        groups: &mut BTreeMap<String, Vec<Version>>,
        provider: &dyn ArchiveProvider,
    ) -> ReconcileRun {
        let mut run = ReconcileRun::default();

        for (page_id, versions) in groups.iter_mut() {
            let nothing_to_bind = Candidates::new(versions).is_empty();
            let empty_page = || PageReconciliation {
                page_id: page_id.clone(),
                ..PageReconciliation::default()
            };
            if nothing_to_bind && !self.options.include_unmatched {
                debug!(page_id = %page_id, "No candidate versions, archive skipped");
                run.pages.push(empty_page());
                continue;
            }

            let outcome = match provider.open(page_id).await {
                Ok(mut archive) => self.reconcile_page(page_id, versions, archive.as_mut()).await,
                // 没有候选版本时缺失的归档等同于空流
                Err(ArchiveError::NotFound(_)) if nothing_to_bind => Ok(empty_page()),
                Err(e) => Err(ReconcileError::Archive(e)),
            };

            match outcome {
                Ok(page) => run.pages.push(page),
                Err(e) => {
                    warn!(page_id = %page_id, error = %e, "Page reconciliation failed");
                    self.summary.record_failure(format!("page {}", page_id), e.to_string());
                    run.failures.push(e);
                }
            }
        }

        run
    }
}

#[cfg(test)]
#[path = "reconcile_service_test.rs"]
mod tests;
