// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::archive::ArchiveEntry;

/// 归档读取错误
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive not found: {0}")]
    NotFound(String),
    #[error("malformed entry {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// 批量归档
///
/// 有限、可重启的惰性条目序列，由单一顺序消费者拉取。
#[async_trait]
pub trait ArchiveSource: Send {
    /// 拉取下一个条目，序列结束时返回 None
    async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, ArchiveError>;

    /// 回到序列开头
    async fn restart(&mut self) -> Result<(), ArchiveError>;
}

/// 按页面ID打开归档
#[async_trait]
pub trait ArchiveProvider: Send + Sync {
    async fn open(&self, page_id: &str) -> Result<Box<dyn ArchiveSource>, ArchiveError>;
}
