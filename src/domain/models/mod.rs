// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 站点与页面（site）：被监控层级的上两层
/// - 版本（version）：页面快照及其抓取结果
/// - 归档条目（archive）：批量归档迭代产生的临时条目
/// - 报告（report）：分组排序后的报告行
/// - 运行汇总（summary）：逐项失败的累计
pub mod archive;
pub mod page_record;
pub mod report;
pub mod site;
pub mod summary;
pub mod version;
