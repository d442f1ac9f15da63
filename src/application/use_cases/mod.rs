// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 每个用例代表一个完整的运行流程
/// - 在线监控（monitor_use_case）
/// - 归档对账（reconcile_use_case）
pub mod monitor_use_case;
pub mod reconcile_use_case;
