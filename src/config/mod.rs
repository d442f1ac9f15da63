// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理变更源、过滤、调度、抓取、报告与对账等配置
pub mod settings;
