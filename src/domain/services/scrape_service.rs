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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::page_record::PageRecord;
use crate::domain::models::site::{Page, Site};
use crate::domain::models::summary::RunSummary;
use crate::domain::models::version::{Version, VersionSelection};
use crate::domain::repositories::change_source::{ChangeSource, Listing};
use crate::domain::services::date_filter::DateRange;
use crate::engines::governor::RequestGovernor;
use crate::utils::errors::SourceError;

/// 抓取编排配置
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// 日期区间
    pub range: DateRange,
    /// 是否把错误版本单独列出
    pub skip_error_versions: bool,
    /// 是否只保留最新版本
    pub latest_version_only: bool,
    /// 列表翻页之间的等待
    pub page_delay: Duration,
}

/// 抓取编排服务
///
/// 依次遍历 站点 → 页面 → 版本，应用日期区间、空页面与错误版本筛选，
/// 得到本次运行范围内的版本集合
pub struct ScrapeService<S: ChangeSource> {
    source: Arc<S>,
    governor: Arc<RequestGovernor>,
    summary: Arc<RunSummary>,
    options: ScrapeOptions,
}

impl<S: ChangeSource> ScrapeService<S> {
    pub fn new(
        source: Arc<S>,
        governor: Arc<RequestGovernor>,
        summary: Arc<RunSummary>,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            source,
            governor,
            summary,
            options,
        }
    }

    /// 沿 `next` 链接翻页直到末页
    async fn paginate<T, F, Fut>(&self, label: &str, mut fetch: F) -> Result<Vec<T>, SourceError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Listing<T>, SourceError>>,
    {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let listing = self
                .governor
                .execute(label, || fetch(cursor.clone()))
                .await?;
            records.extend(listing.records);

            match listing.next {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    warn!(
                        label = %label,
                        next = %next,
                        "Pagination returned the same link, stopping"
                    );
                    break;
                }
                Some(next) => {
                    cursor = Some(next);
                    if !self.options.page_delay.is_zero() {
                        sleep(self.options.page_delay).await;
                    }
                }
                None => break,
            }
        }

        Ok(records)
    }

    /// 列出区间内的站点
    pub async fn list_sites(&self) -> Result<Vec<Site>, SourceError> {
        let source = self.source.as_ref();
        let sites = self
            .paginate("sites", |cursor| async move {
                source.list_sites(cursor.as_deref()).await
            })
            .await?;

        let total = sites.len();
        let sites: Vec<Site> = sites
            .into_iter()
            .filter(|site| self.options.range.accepts_site(site))
            .collect();
        debug!(total, in_range = sites.len(), "Listed sites");
        Ok(sites)
    }

    /// 列出站点下区间内、可能有版本的页面
    pub async fn list_pages(&self, site: &Site) -> Result<Vec<Page>, SourceError> {
        let source = self.source.as_ref();
        let pages = self
            .paginate(&format!("sites/{}/pages", site.id), |cursor| async move {
                source.list_pages(site, cursor.as_deref()).await
            })
            .await?;

        Ok(pages
            .into_iter()
            .filter(|page| {
                if page.is_known_empty() {
                    debug!(page_id = %page.id, "Page has no versions, skipping");
                    return false;
                }
                self.options.range.accepts_page(page)
            })
            .collect())
    }

    /// 列出页面的在范围内版本并做错误/正常拆分
    pub async fn list_versions(&self, page: &Page) -> Result<VersionSelection, SourceError> {
        let source = self.source.as_ref();
        let remote = self
            .paginate(&format!("pages/{}/versions", page.id), |cursor| async move {
                source.list_versions(page, cursor.as_deref()).await
            })
            .await?;

        let mut versions = Vec::with_capacity(remote.len());
        for record in remote {
            let version_id = record.id.clone();
            match record.into_version(&page.site_id, &page.id) {
                Some(version) => versions.push(version),
                None => {
                    warn!(
                        page_id = %page.id,
                        version_id = %version_id,
                        "Version has no resolvable date, excluded"
                    );
                }
            }
        }

        versions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        link_predecessors(&mut versions, self.options.skip_error_versions);
        versions.retain(|version| self.options.range.accepts_version(version));

        Ok(select_versions(
            versions,
            self.options.skip_error_versions,
            self.options.latest_version_only,
        ))
    }

    /// 遍历整个层级
    ///
    /// 站点列表失败直接返回错误；单个站点或页面的失败记录到运行汇总后跳过
    #[instrument(skip(self))]
    pub async fn scrape(&self) -> Result<Vec<PageRecord>, SourceError> {
        let sites = self.list_sites().await?;
        let mut records = Vec::new();

        for site in sites {
            let pages = match self.list_pages(&site).await {
                Ok(pages) => pages,
                Err(e) => {
                    warn!(site_id = %site.id, error = %e, "Failed to list pages");
                    self.summary
                        .record_failure(format!("site {}", site.id), e.to_string());
                    continue;
                }
            };
            self.summary.record_pages(pages.len());

            for page in pages {
                match self.list_versions(&page).await {
                    Ok(selection) if selection.is_empty() => {
                        debug!(page_id = %page.id, "No versions in scope");
                    }
                    Ok(selection) => {
                        self.summary.record_versions(
                            selection.versions.len() + selection.error_versions.len(),
                        );
                        records.push(PageRecord::new(site.clone(), page, selection));
                    }
                    Err(e) if e.is_gone() => {
                        debug!(page_id = %page.id, "Page vanished before its versions were listed");
                        self.summary.record_gone();
                    }
                    Err(e) => {
                        warn!(page_id = %page.id, error = %e, "Failed to list versions");
                        self.summary
                            .record_failure(format!("page {}", page.id), e.to_string());
                    }
                }
            }
        }

        info!(pages = records.len(), "Scrape finished");
        Ok(records)
    }
}

/// 记录每个版本的差异所对比的前一版本
///
/// `versions` 需按日期升序。跳过错误版本时对比的是前一个非错误版本。
pub fn link_predecessors(versions: &mut [Version], skip_error_versions: bool) {
    let mut previous: Option<String> = None;
    for version in versions.iter_mut() {
        version.previous_id = previous.clone();
        if !(skip_error_versions && version.is_error()) {
            previous = Some(version.id.clone());
        }
    }
}

/// 版本拆分与截断
///
/// `versions` 需按日期升序。开启跳过错误版本时：
/// - 主集合只含无错误码的版本；只保留最新时取其中最新的一个，即使存在更新的错误版本；
/// - 错误集合在只保留最新时先对全部版本截断再筛选，因此只有当整体最新版本是错误版本时才会列出它。
pub fn select_versions(
    versions: Vec<Version>,
    skip_error_versions: bool,
    latest_version_only: bool,
) -> VersionSelection {
    let earliest = versions.first().cloned();

    if !skip_error_versions {
        let versions = if latest_version_only {
            versions.into_iter().last().into_iter().collect()
        } else {
            versions
        };
        return VersionSelection {
            versions,
            error_versions: Vec::new(),
            earliest,
        };
    }

    if latest_version_only {
        let error_versions = versions
            .last()
            .filter(|version| version.is_error())
            .cloned()
            .into_iter()
            .collect();
        let safe = versions
            .into_iter()
            .filter(|version| !version.is_error())
            .last()
            .into_iter()
            .collect();
        VersionSelection {
            versions: safe,
            error_versions,
            earliest,
        }
    } else {
        let (error_versions, safe): (Vec<_>, Vec<_>) =
            versions.into_iter().partition(Version::is_error);
        VersionSelection {
            versions: safe,
            error_versions,
            earliest,
        }
    }
}

#[cfg(test)]
#[path = "scrape_service_test.rs"]
mod tests;
