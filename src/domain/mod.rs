// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：站点、页面、版本、报告等数据结构
/// - 仓库接口（repositories）：变更源、存储、归档的抽象接口
/// - 服务（services）：筛选、抓取、对账与报告聚合
///
/// 领域层不依赖任何具体的网络或文件系统实现。
pub mod models;
pub mod repositories;
pub mod services;
