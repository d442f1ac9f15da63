// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 页面版本
///
/// 某一时刻被监控页面的一次快照。`id` 是不可变身份，
/// 其余抓取结果字段由抓取引擎或归档对账器原地回填。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// 版本唯一标识符
    pub id: String,
    /// 所属页面ID
    pub page_id: String,
    /// 所属站点ID
    pub site_id: String,
    /// 版本捕获时间，序列化为 ISO-8601
    pub date: DateTime<Utc>,
    /// 是否有可下载的原始内容
    #[serde(default)]
    pub has_content: bool,
    /// 变更源在捕获时遇到的错误状态码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    /// 原始内容地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// 与上一版本的差异地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_url: Option<String>,
    /// 与上一个非错误版本的差异地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_safe_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_diff_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_diff_length: Option<u64>,
    /// 原始内容落盘路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_diff_file_path: Option<String>,
    /// 差异所对比的前一版本ID，截断后仍保留
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
}

impl Version {
    /// 是否为错误版本
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    /// 产物存储键 `{site_id}/{page_id}/{version_id}.{ext}`
    pub fn storage_key(&self, extension: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            self.site_id, self.page_id, self.id, extension
        )
    }

    /// 写回内容抓取结果
    pub fn apply_content(&mut self, result: &ContentResult) {
        self.content_hash = Some(result.hash.clone());
        self.content_length = Some(result.length);
        if result.file_path.is_some() {
            self.file_path = result.file_path.clone();
        }
    }

    /// 写回差异抓取结果
    pub fn apply_diff(&mut self, result: &DiffResult) {
        match result.kind {
            DiffKind::Full => {
                self.diff_hash = Some(result.hash.clone());
                self.diff_length = Some(result.length);
                if result.file_path.is_some() {
                    self.diff_file_path = result.file_path.clone();
                }
            }
            DiffKind::Text => {
                self.text_diff_hash = Some(result.hash.clone());
                self.text_diff_length = Some(result.length);
                if result.file_path.is_some() {
                    self.text_diff_file_path = result.file_path.clone();
                }
            }
        }
    }
}

/// 差异类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// 完整源码差异
    Full,
    /// 仅文本差异
    Text,
}

impl DiffKind {
    /// 落盘文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            DiffKind::Full => "diff.html",
            DiffKind::Text => "diff.txt",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::Full => write!(f, "full"),
            DiffKind::Text => write!(f, "text"),
        }
    }
}

/// 内容抓取结果
#[derive(Debug, Clone, PartialEq)]
pub struct ContentResult {
    pub hash: String,
    pub length: u64,
    pub file_path: Option<String>,
}

/// 差异抓取结果
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub kind: DiffKind,
    pub hash: String,
    pub length: u64,
    pub file_path: Option<String>,
}

/// 页面版本筛选结果
///
/// `versions` 为主集合；开启跳过错误版本时，`error_versions` 单独列出错误版本。
/// `earliest` 是截断前区间内最早的版本，用作报告中的基准版本。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionSelection {
    pub versions: Vec<Version>,
    pub error_versions: Vec<Version>,
    pub earliest: Option<Version>,
}

impl VersionSelection {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.error_versions.is_empty()
    }
}

/// 变更源列表接口返回的版本记录
///
/// 日期以原始字符串给出，可能缺失或无法解析。
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVersion {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub has_content: bool,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub diff_url: Option<String>,
    #[serde(default)]
    pub diff_safe_url: Option<String>,
}

impl RemoteVersion {
    /// 解析版本日期
    ///
    /// 支持 RFC 3339 以及不带时区的 `YYYY-MM-DDTHH:MM:SS`（按 UTC 处理）
    pub fn resolve_date(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// 转换为领域版本，日期无法解析时返回 None
    pub fn into_version(self, site_id: &str, page_id: &str) -> Option<Version> {
        let date = self.resolve_date()?;
        Some(Version {
            id: self.id,
            page_id: page_id.to_string(),
            site_id: site_id.to_string(),
            date,
            has_content: self.has_content,
            error_code: self.error_code,
            content_url: self.content_url,
            diff_url: self.diff_url,
            diff_safe_url: self.diff_safe_url,
            content_hash: None,
            content_length: None,
            diff_hash: None,
            diff_length: None,
            text_diff_hash: None,
            text_diff_length: None,
            file_path: None,
            diff_file_path: None,
            text_diff_file_path: None,
            previous_id: None,
        })
    }
}
