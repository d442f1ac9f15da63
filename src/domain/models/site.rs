// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 被监控站点
///
/// 层级结构的根节点，拥有零个或多个页面。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// 站点唯一标识符
    pub id: String,
    /// 站点名称，形如 `EPA - epa.gov`
    pub name: String,
    /// 站点地址
    pub url: String,
    /// 最近一次检测到变更的时间
    #[serde(default)]
    pub last_change_date: Option<DateTime<Utc>>,
}

impl Site {
    /// 站点维护方
    ///
    /// 取站点名称中 `" - "` 之前的部分，没有分隔符时返回完整名称
    pub fn maintainers(&self) -> &str {
        match self.name.split_once(" - ") {
            Some((maintainers, _)) => maintainers.trim(),
            None => self.name.trim(),
        }
    }
}

/// 被监控页面
///
/// 隶属于唯一的站点，拥有零个或多个版本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 页面唯一标识符
    pub id: String,
    /// 所属站点ID
    pub site_id: String,
    /// 被监控的页面地址
    pub url: String,
    /// 变更源给出的版本数提示，未知时为 None
    #[serde(default)]
    pub total_versions_hint: Option<u64>,
    /// 页面标题
    #[serde(default)]
    pub title: Option<String>,
    /// 页面标签，用于报告分组
    #[serde(default)]
    pub tags: Vec<String>,
    /// 变更源上的页面查看地址
    #[serde(default)]
    pub view_url: Option<String>,
    /// 最近一次检测到变更的时间
    #[serde(default)]
    pub last_change_date: Option<DateTime<Utc>>,
}

impl Page {
    /// 页面是否确定没有任何版本
    ///
    /// 只有版本数提示已知且恰好为 0 时才返回 true
    pub fn is_known_empty(&self) -> bool {
        self.total_versions_hint == Some(0)
    }

    /// 页面查看链接，缺省时回退到被监控地址
    pub fn view_link(&self) -> &str {
        self.view_url.as_deref().unwrap_or(&self.url)
    }
}
