// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义远程变更源、存储与批量归档的抽象接口
pub mod archive_source;
pub mod change_source;
pub mod storage_repository;
