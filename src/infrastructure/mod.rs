// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，依赖于领域层的抽象接口：
/// - 存储（storage）：本地文件与内存存储
/// - 归档（archive）：目录与内存形式的批量归档
/// - 元数据（metadata）：逐行 JSON 的版本与页面记录
/// - 报告输出（report_writer）：按分组写出 CSV
pub mod archive;
pub mod metadata;
pub mod report_writer;
pub mod storage;
