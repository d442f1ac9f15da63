// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::models::version::DiffKind;
use crate::domain::repositories::archive_source::ArchiveError;
use crate::domain::repositories::storage_repository::StorageError;

/// 远程变更源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    /// 目标资源已不存在（发现与抓取之间被上游删除）
    #[error("Resource gone: {0}")]
    Gone(String),
    /// 非成功的HTTP状态码
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    /// 请求失败
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 响应解析失败
    #[error("Decode error: {0}")]
    Decode(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl SourceError {
    /// 判断错误是否可重试
    ///
    /// 网络错误与服务端 5xx 状态视为瞬时故障
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Request(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            SourceError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// 是否为"资源已不存在"的良性竞争
    pub fn is_gone(&self) -> bool {
        matches!(self, SourceError::Gone(_))
    }
}

/// 单个版本抓取失败
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to fetch {kind} for version {version_id} ({url}): {source}")]
    Fetch {
        version_id: String,
        kind: &'static str,
        url: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to store {kind} for version {version_id}: {source}")]
    Storage {
        version_id: String,
        kind: &'static str,
        #[source]
        source: StorageError,
    },
}

impl CaptureError {
    pub fn fetch(version_id: &str, kind: CaptureKind, url: &str, source: SourceError) -> Self {
        CaptureError::Fetch {
            version_id: version_id.to_string(),
            kind: kind.as_str(),
            url: url.to_string(),
            source,
        }
    }
}

/// 抓取对象种类，用于日志与错误上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Content,
    Diff(DiffKind),
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Content => "content",
            CaptureKind::Diff(DiffKind::Full) => "diff",
            CaptureKind::Diff(DiffKind::Text) => "text diff",
        }
    }
}

/// 归档对账错误类型
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// 归档流结束后仍有版本未匹配，意味着数据丢失
    #[error("page {page_id}: {} version(s) left unmatched: {}", version_ids.len(), version_ids.join(", "))]
    UnmatchedVersions {
        page_id: String,
        version_ids: Vec<String>,
    },

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// 配置错误类型，启动阶段即终止
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("无效日期: {0}")]
    InvalidDate(String),

    #[error("无效配置值: {0}")]
    InvalidValue(String),

    #[error("缺少访问凭据 (source.api_token)")]
    MissingCredentials,
}
