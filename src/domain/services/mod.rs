// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务：
/// - 抓取编排（scrape_service）：分页遍历站点、页面与版本并应用过滤规则
/// - 抓取引擎（capture_service）：经调度器抓取内容与差异并回填版本记录
/// - 归档对账（reconcile_service）：把批量归档条目映射回版本记录
/// - 报告聚合（report_service）：分组、去重并排序报告行
/// - 日期过滤（date_filter）：日期区间判定
///
/// 领域服务只包含业务规则，具体的网络与存储实现由调用方注入。
pub mod capture_service;
pub mod date_filter;
pub mod reconcile_service;
pub mod report_service;
pub mod scrape_service;

#[cfg(test)]
pub(crate) mod test_support;
