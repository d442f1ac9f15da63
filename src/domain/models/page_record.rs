// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::{Version, VersionSelection};

/// 一个页面及其在本次运行中的版本
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub site: Site,
    pub page: Page,
    /// 主集合，按日期升序
    pub versions: Vec<Version>,
    /// 单独列出的错误版本，按日期升序
    pub error_versions: Vec<Version>,
    /// 区间内最早的版本
    pub earliest: Option<Version>,
}

impl PageRecord {
    pub fn new(site: Site, page: Page, selection: VersionSelection) -> Self {
        Self {
            site,
            page,
            versions: selection.versions,
            error_versions: selection.error_versions,
            earliest: selection.earliest,
        }
    }

    /// 全部版本（主集合与错误版本）
    pub fn all_versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter().chain(self.error_versions.iter())
    }

    pub fn all_versions_mut(&mut self) -> impl Iterator<Item = &mut Version> {
        self.versions.iter_mut().chain(self.error_versions.iter_mut())
    }

    /// 最新版本，日期相同时取ID较大者
    pub fn latest(&self) -> Option<&Version> {
        self.all_versions()
            .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
    }

    /// 早于 `version` 的最新非错误版本
    pub fn latest_safe_before(&self, version: &Version) -> Option<&Version> {
        self.all_versions()
            .filter(|v| !v.is_error() && v.date < version.date)
            .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
    }

    /// 报告用的基准版本：区间内最早的版本，缺省时取已知版本中最早的
    pub fn base_version(&self) -> Option<&Version> {
        self.earliest.as_ref().or_else(|| {
            self.all_versions()
                .min_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
        })
    }
}
