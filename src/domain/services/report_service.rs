// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::models::page_record::PageRecord;
use crate::domain::models::report::{ChangeGroup, Report, ReportRow};
use crate::domain::models::version::Version;
use crate::utils::hashing;

/// 报告分组配置
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// 参与分组的标签前缀
    pub group_prefix: String,
    /// 没有匹配标签时的分组
    pub default_group: String,
    /// 最新版本是错误版本时使用的保留分组
    pub errors_group: String,
    /// 是否保留差异为"无变化"的行
    pub include_unchanged: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            group_prefix: "site:".to_string(),
            default_group: "no group".to_string(),
            errors_group: "errors".to_string(),
            include_unchanged: true,
        }
    }
}

/// 行优先级规则
pub trait PriorityRule: Send + Sync {
    fn score(&self, latest: &Version) -> f64;
}

/// 按文本差异大小打分
///
/// 无变化为 0，其余按长度取对数并归一到 `[0, 1]`，保留两位小数
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffSizePriority;

const SATURATION_LENGTH: f64 = 100_000.0;

impl PriorityRule for DiffSizePriority {
    fn score(&self, latest: &Version) -> f64 {
        let unchanged = latest
            .text_diff_hash
            .as_deref()
            .or(latest.diff_hash.as_deref())
            .is_some_and(hashing::is_no_change);
        if unchanged {
            return 0.0;
        }

        let length = latest.text_diff_length.or(latest.diff_length).unwrap_or(0) as f64;
        let raw = ((1.0 + length).ln() / (1.0 + SATURATION_LENGTH).ln()).min(1.0);
        (raw * 100.0).round() / 100.0
    }
}

/// 报告聚合器
pub struct ReportService {
    options: ReportOptions,
    priority: Box<dyn PriorityRule>,
}

impl ReportService {
    pub fn new(options: ReportOptions) -> Self {
        Self::with_priority(options, Box::new(DiffSizePriority))
    }

    pub fn with_priority(options: ReportOptions, priority: Box<dyn PriorityRule>) -> Self {
        Self { options, priority }
    }

    /// 页面所属分组：字典序最小的带前缀标签（去掉前缀），否则为默认分组
    pub fn group_for(&self, record: &PageRecord) -> String {
        record
            .page
            .tags
            .iter()
            .filter_map(|tag| tag.strip_prefix(self.options.group_prefix.as_str()))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .min()
            .map(str::to_string)
            .unwrap_or_else(|| self.options.default_group.clone())
    }

    fn previous_of(record: &PageRecord, latest: &Version) -> Option<String> {
        if latest.previous_id.is_some() {
            return latest.previous_id.clone();
        }
        record
            .all_versions()
            .filter(|v| (v.date, &v.id) < (latest.date, &latest.id))
            .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
            .map(|v| v.id.clone())
    }

    fn row(&self, record: &PageRecord, latest: &Version, report_time: DateTime<Utc>) -> ReportRow {
        let view = record.page.view_link().trim_end_matches('/').to_string();
        let base = record.base_version().filter(|base| base.id != latest.id);
        let diff_view_url = Some(match Self::previous_of(record, latest) {
            Some(previous) => format!("{}/{}:{}", view, latest.id, previous),
            None => format!("{}/{}", view, latest.id),
        });

        ReportRow {
            index: 0,
            version_id: latest.id.clone(),
            report_time,
            maintainers: record.site.maintainers().to_string(),
            site_name: record.site.name.clone(),
            title: record.page.title.clone().unwrap_or_default(),
            url: record.page.url.clone(),
            page_view_url: record.page.view_link().to_string(),
            diff_view_url,
            diff_from_earliest_url: base.map(|base| format!("{}/{}:{}", view, latest.id, base.id)),
            capture_time: latest.date,
            earliest_capture_time: base.map(|base| base.date),
            diff_length: latest.diff_length,
            diff_hash: latest.diff_hash.clone(),
            text_diff_length: latest.text_diff_length,
            text_diff_hash: latest.text_diff_hash.clone(),
            priority: self.priority.score(latest),
        }
    }

    fn keep(&self, row: &ReportRow) -> bool {
        self.options.include_unchanged
            || !row.diff_hash.as_deref().is_some_and(hashing::is_no_change)
    }

    /// 把页面记录分配到各分组
    ///
    /// 最新版本为错误版本时，页面进入错误分组；若存在更早的非错误版本，
    /// 再以该版本作为最新版本放入常规分组。
    fn assign(
        &self,
        records: &[PageRecord],
        report_time: DateTime<Utc>,
    ) -> BTreeMap<String, Vec<ReportRow>> {
        let mut groups: BTreeMap<String, Vec<ReportRow>> = BTreeMap::new();

        for record in records {
            let Some(latest) = record.latest() else {
                continue;
            };
            let group = self.group_for(record);

            if latest.is_error() {
                groups
                    .entry(self.options.errors_group.clone())
                    .or_default()
                    .push(self.row(record, latest, report_time));
                if let Some(safe) = record.latest_safe_before(latest) {
                    groups
                        .entry(group)
                        .or_default()
                        .push(self.row(record, safe, report_time));
                }
            } else {
                groups
                    .entry(group)
                    .or_default()
                    .push(self.row(record, latest, report_time));
            }
        }

        groups
    }

    /// 构建报告
    ///
    /// 相同差异哈希的行聚成一簇且不被拆开；簇按最高优先级降序排列，
    /// 簇内按（哈希升序，优先级降序，抓取时间升序）排列。
    pub fn build_report(&self, records: &[PageRecord], report_time: DateTime<Utc>) -> Report {
        let mut report = Report::default();

        for (name, rows) in self.assign(records, report_time) {
            let mut clusters: BTreeMap<String, ChangeGroup> = BTreeMap::new();
            let mut singletons: Vec<ChangeGroup> = Vec::new();
            for row in rows.into_iter().filter(|row| self.keep(row)) {
                match row.diff_hash.clone() {
                    Some(hash) => clusters
                        .entry(hash.clone())
                        .or_insert_with(|| ChangeGroup::new(Some(hash)))
                        .push(row),
                    None => {
                        let mut group = ChangeGroup::new(None);
                        group.push(row);
                        singletons.push(group);
                    }
                }
            }

            let mut ordered: Vec<ChangeGroup> = clusters.into_values().chain(singletons).collect();
            for group in &mut ordered {
                group.members.sort_by(compare_members);
            }
            ordered.sort_by(compare_groups);

            let rows: Vec<ReportRow> = ordered
                .into_iter()
                .flat_map(|group| group.members)
                .enumerate()
                .map(|(i, mut row)| {
                    row.index = i + 1;
                    row
                })
                .collect();
            debug!(group = %name, rows = rows.len(), "Report group built");
            if !rows.is_empty() {
                report.groups.insert(name, rows);
            }
        }

        report
    }
}

fn compare_members(a: &ReportRow, b: &ReportRow) -> Ordering {
    a.diff_hash
        .cmp(&b.diff_hash)
        .then_with(|| b.priority.total_cmp(&a.priority))
        .then_with(|| a.capture_time.cmp(&b.capture_time))
        .then_with(|| a.version_id.cmp(&b.version_id))
}

fn compare_groups(a: &ChangeGroup, b: &ChangeGroup) -> Ordering {
    let first_capture = |g: &ChangeGroup| {
        g.members
            .first()
            .map(|row| (row.capture_time, row.version_id.clone()))
    };
    b.max_priority
        .total_cmp(&a.max_priority)
        .then_with(|| a.key.cmp(&b.key))
        .then_with(|| first_capture(a).cmp(&first_capture(b)))
}

#[cfg(test)]
#[path = "report_service_test.rs"]
mod tests;
