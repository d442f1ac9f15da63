// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// 批量归档中的单个条目
///
/// 由归档迭代产生，恰好被对账器消费一次。`timestamp` 来自归档内部记录，
/// 与版本的 `date` 并不精确相等。
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// 条目在归档内的路径
    pub path: String,
    /// 文件扩展名（不含点）
    pub extension: String,
    /// 归档内部记录的时间戳
    pub timestamp: DateTime<Utc>,
    /// 条目内容
    pub content: Bytes,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, timestamp: DateTime<Utc>, content: Bytes) -> Self {
        let path = path.into();
        let extension = std::path::Path::new(&path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            extension,
            timestamp,
            content,
        }
    }

    /// 条目在归档中的文件名
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}
