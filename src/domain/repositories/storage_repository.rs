// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 非法的存储键
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// 抓取结果与对账产物的存储
///
/// 键为 `/` 分隔的相对路径，如 `{site_id}/{page_id}/{version_id}.html`
#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// 保存数据，返回写入位置（记录到版本的 `file_path`）
    async fn save(&self, key: &str, data: &[u8]) -> Result<String, StorageError>;

    /// 根据键读取数据
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}
