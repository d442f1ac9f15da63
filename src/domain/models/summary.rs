// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// 单条失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// 失败对象（版本ID或页面ID）
    pub subject: String,
    pub detail: String,
}

#[derive(Debug, Default)]
struct SummaryState {
    pages: usize,
    versions: usize,
    captures: usize,
    skipped_gone: usize,
    failures: Vec<FailureRecord>,
}

/// 运行汇总
///
/// 显式的运行状态对象，累计逐项失败并在运行结束时输出，不打断流水线。
#[derive(Debug)]
pub struct RunSummary {
    run_id: Uuid,
    state: Mutex<SummaryState>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: Mutex::new(SummaryState::default()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record_pages(&self, count: usize) {
        self.state.lock().pages += count;
    }

    pub fn record_versions(&self, count: usize) {
        self.state.lock().versions += count;
    }

    pub fn record_capture(&self) {
        self.state.lock().captures += 1;
    }

    pub fn record_gone(&self) {
        self.state.lock().skipped_gone += 1;
    }

    pub fn record_failure(&self, subject: impl Into<String>, detail: impl Into<String>) {
        self.state.lock().failures.push(FailureRecord {
            subject: subject.into(),
            detail: detail.into(),
        });
    }

    pub fn failure_count(&self) -> usize {
        self.state.lock().failures.len()
    }

    pub fn failures(&self) -> Vec<FailureRecord> {
        self.state.lock().failures.clone()
    }

    pub fn captures(&self) -> usize {
        self.state.lock().captures
    }

    /// 输出运行结束汇总
    pub fn log(&self) {
        let state = self.state.lock();
        info!(
            run_id = %self.run_id,
            pages = state.pages,
            versions = state.versions,
            captures = state.captures,
            gone = state.skipped_gone,
            failures = state.failures.len(),
            "Run finished"
        );
        for failure in &state.failures {
            warn!(run_id = %self.run_id, subject = %failure.subject, "{}", failure.detail);
        }
    }
}
