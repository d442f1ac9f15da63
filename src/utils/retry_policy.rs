// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::utils::errors::SourceError;

/// 重试策略配置
///
/// 第一次重试不等待，之后从 `initial_backoff` 起每次翻倍
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次请求）
    pub max_attempts: u32,
    /// 第二次重试前的退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            ..Self::default()
        }
    }

    /// 不重试
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// 计算第 `attempt` 次失败后的退避时间（attempt 从 1 开始）
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2f64.powi(attempt as i32 - 2);
        let backoff_secs = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(backoff_secs.min(self.max_backoff.as_secs_f64()))
    }

    /// 第 `attempt` 次失败后是否还能重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// 根据错误类型判断是否应该重试
    pub fn should_retry_with_error(&self, attempt: u32, error: &SourceError) -> bool {
        self.should_retry(attempt) && error.is_retryable()
    }
}
