// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod http_source_test;
pub mod monitor_pipeline_test;
pub mod reconcile_pipeline_test;
pub mod support;
