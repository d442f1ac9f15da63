// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::utils::hashing;

/// 报告列定义，顺序固定
pub const REPORT_COLUMNS: [&str; 17] = [
    "Index",
    "Version ID",
    "Output Date/Time",
    "Maintainers",
    "Site Name",
    "Page Name",
    "URL",
    "Page View URL",
    "Last Two - Side by Side",
    "Latest to Base - Side by Side",
    "Date Found - Latest",
    "Date Found - Base",
    "Diff Length",
    "Diff Hash",
    "Text Diff Length",
    "Text Diff Hash",
    "Priority",
];

/// 报告行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// 组内序号，从 1 开始
    pub index: usize,
    pub version_id: String,
    pub report_time: DateTime<Utc>,
    pub maintainers: String,
    pub site_name: String,
    pub title: String,
    pub url: String,
    pub page_view_url: String,
    pub diff_view_url: Option<String>,
    pub diff_from_earliest_url: Option<String>,
    pub capture_time: DateTime<Utc>,
    pub earliest_capture_time: Option<DateTime<Utc>>,
    pub diff_length: Option<u64>,
    pub diff_hash: Option<String>,
    pub text_diff_length: Option<u64>,
    pub text_diff_hash: Option<String>,
    pub priority: f64,
}

impl ReportRow {
    /// 按固定列顺序渲染为字符串字段
    pub fn to_record(&self) -> Vec<String> {
        fn time(value: &DateTime<Utc>) -> String {
            value.to_rfc3339_opts(SecondsFormat::Secs, true)
        }
        fn number(value: Option<u64>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        vec![
            self.index.to_string(),
            self.version_id.clone(),
            time(&self.report_time),
            self.maintainers.clone(),
            self.site_name.clone(),
            self.title.clone(),
            self.url.clone(),
            self.page_view_url.clone(),
            self.diff_view_url.clone().unwrap_or_default(),
            self.diff_from_earliest_url.clone().unwrap_or_default(),
            time(&self.capture_time),
            self.earliest_capture_time.as_ref().map(time).unwrap_or_default(),
            number(self.diff_length),
            hashing::display_hash(self.diff_hash.as_deref()),
            number(self.text_diff_length),
            hashing::display_hash(self.text_diff_hash.as_deref()),
            format!("{:.2}", self.priority),
        ]
    }
}

/// 共享同一差异指纹的行簇
///
/// 只在报告聚合器内部构建和消费
#[derive(Debug, Clone)]
pub struct ChangeGroup {
    /// 差异指纹；无差异哈希的行各自成簇，此时为 None
    pub key: Option<String>,
    pub members: Vec<ReportRow>,
    pub max_priority: f64,
}

impl ChangeGroup {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key,
            members: Vec::new(),
            max_priority: f64::NEG_INFINITY,
        }
    }

    pub fn push(&mut self, row: ReportRow) {
        self.max_priority = self.max_priority.max(row.priority);
        self.members.push(row);
    }
}

/// 报告：分组名到有序行列表
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub groups: BTreeMap<String, Vec<ReportRow>>,
}

impl Report {
    pub fn group(&self, name: &str) -> Option<&[ReportRow]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn total_rows(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
