// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::{DiffKind, RemoteVersion};
use crate::utils::errors::SourceError;

/// 分页列表结果
///
/// 一页记录加上下一页链接，`next` 为 None 时表示已到末页
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub next: Option<String>,
}

/// 远程变更源
///
/// 列表接口按 `next` 链接分页；`cursor` 为 None 时请求第一页，否则为上一页返回的 `next`。
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// 列出站点
    async fn list_sites(&self, cursor: Option<&str>) -> Result<Listing<Site>, SourceError>;

    /// 列出站点下的页面
    async fn list_pages(
        &self,
        site: &Site,
        cursor: Option<&str>,
    ) -> Result<Listing<Page>, SourceError>;

    /// 列出页面下的版本
    async fn list_versions(
        &self,
        page: &Page,
        cursor: Option<&str>,
    ) -> Result<Listing<RemoteVersion>, SourceError>;

    /// 获取版本原始内容
    async fn fetch_content(&self, url: &str) -> Result<Bytes, SourceError>;

    /// 获取差异
    async fn fetch_diff(&self, url: &str, kind: DiffKind) -> Result<Bytes, SourceError>;
}
