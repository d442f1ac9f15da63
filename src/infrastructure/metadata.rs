// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 逐行 JSON 元数据
//!
//! 在线流程每行写出一个版本记录，对账流程原样读回。页面上下文单独写入
//! 另一个文件，使对账后的记录可以继续生成报告。

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::domain::models::page_record::PageRecord;
use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::{Version, VersionSelection};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 页面上下文：报告所需的站点与页面信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    pub site: Site,
    pub page: Page,
}

fn encode_lines<'a, T: Serialize + 'a>(
    records: impl IntoIterator<Item = &'a T>,
) -> Result<String, MetadataError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

fn decode_lines<T: DeserializeOwned>(input: &str) -> Result<Vec<T>, MetadataError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| MetadataError::Json { line: i + 1, source })
        })
        .collect()
}

pub fn encode_versions<'a>(
    versions: impl IntoIterator<Item = &'a Version>,
) -> Result<String, MetadataError> {
    encode_lines(versions)
}

pub fn decode_versions(input: &str) -> Result<Vec<Version>, MetadataError> {
    decode_lines(input)
}

/// 按页面ID分组，组内保持原有顺序
pub fn group_by_page(versions: Vec<Version>) -> BTreeMap<String, Vec<Version>> {
    let mut groups: BTreeMap<String, Vec<Version>> = BTreeMap::new();
    for version in versions {
        groups.entry(version.page_id.clone()).or_default().push(version);
    }
    groups
}

pub async fn write_versions<'a>(
    path: &Path,
    versions: impl IntoIterator<Item = &'a Version>,
) -> Result<(), MetadataError> {
    let body = encode_versions(versions)?;
    write_file(path, body).await
}

pub async fn read_versions(path: &Path) -> Result<Vec<Version>, MetadataError> {
    decode_versions(&fs::read_to_string(path).await?)
}

pub async fn write_pages(path: &Path, records: &[PageRecord]) -> Result<(), MetadataError> {
    let contexts: Vec<PageContext> = records
        .iter()
        .map(|r| PageContext {
            site: r.site.clone(),
            page: r.page.clone(),
        })
        .collect();
    write_file(path, encode_lines(&contexts)?).await
}

/// 读取页面上下文，文件不存在时返回空列表
pub async fn read_pages(path: &Path) -> Result<Vec<PageContext>, MetadataError> {
    match fs::read_to_string(path).await {
        Ok(body) => decode_lines(&body),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(MetadataError::Io(e)),
    }
}

async fn write_file(path: &Path, body: String) -> Result<(), MetadataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, body).await?;
    Ok(())
}

/// 用页面上下文与分组后的版本重建页面记录
///
/// 没有上下文的页面被跳过
pub fn rebuild_records(
    contexts: Vec<PageContext>,
    mut groups: BTreeMap<String, Vec<Version>>,
) -> Vec<PageRecord> {
    contexts
        .into_iter()
        .filter_map(|context| {
            let mut versions = groups.remove(&context.page.id)?;
            versions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            let selection = VersionSelection {
                earliest: versions.first().cloned(),
                versions,
                error_versions: Vec::new(),
            };
            Some(PageRecord::new(context.site, context.page, selection))
        })
        .collect()
}
