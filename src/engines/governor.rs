// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use crate::utils::errors::SourceError;
use crate::utils::retry_policy::RetryPolicy;

/// 请求调度配置
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// 同时在途请求上限
    pub max_concurrency: usize,
    /// 滚动窗口内允许发起的请求数，0 表示不限
    pub requests_per_window: u32,
    /// 滚动窗口长度
    pub window: Duration,
    /// 每发起多少个请求暂停一次，0 表示不暂停
    pub pause_every: u32,
    /// 暂停时长
    pub pause: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            requests_per_window: 60,
            window: Duration::from_secs(60),
            pause_every: 0,
            pause: Duration::ZERO,
        }
    }
}

/// 滚动窗口状态
///
/// 只在持有锁时读写，调度判断与计数更新是原子的
#[derive(Debug, Default)]
struct RateWindow {
    /// 窗口内各请求的发起时刻
    issued: VecDeque<Instant>,
    /// 累计发起数，用于暂停节奏
    total: u64,
    /// 暂停截止时刻
    paused_until: Option<Instant>,
}

/// 请求调度器
///
/// 同时限制在途请求数、滚动 60 秒窗口内的请求数，并按固定节奏插入暂停；
/// 瞬时失败按 [`RetryPolicy`] 重试。
pub struct RequestGovernor {
    config: GovernorConfig,
    retry: RetryPolicy,
    semaphore: Semaphore,
    window: Mutex<RateWindow>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    issued: AtomicU64,
}

/// 在途请求许可，释放时归还并发槽位
pub struct GovernorPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for GovernorPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestGovernor {
    pub fn new(config: GovernorConfig, retry: RetryPolicy) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            config,
            retry,
            semaphore: Semaphore::new(permits),
            window: Mutex::new(RateWindow::default()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            issued: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// 等待并发、速率与暂停条件全部满足后取得许可
    pub async fn acquire(&self) -> Result<GovernorPermit<'_>, SourceError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| SourceError::Other(format!("governor closed: {}", e)))?;
        self.reserve_slot().await;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.issued.fetch_add(1, Ordering::SeqCst);

        Ok(GovernorPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    async fn reserve_slot(&self) {
        let mut window = self.window.lock().await;
        loop {
            let now = Instant::now();

            if let Some(until) = window.paused_until {
                if now < until {
                    sleep_until(until).await;
                    continue;
                }
                window.paused_until = None;
            }

            while let Some(&front) = window.issued.front() {
                if now.duration_since(front) >= self.config.window {
                    window.issued.pop_front();
                } else {
                    break;
                }
            }

            let limit = self.config.requests_per_window as usize;
            if limit > 0 && window.issued.len() >= limit {
                if let Some(&front) = window.issued.front() {
                    debug!(
                        in_window = window.issued.len(),
                        "Rate ceiling reached, waiting for window"
                    );
                    sleep_until(front + self.config.window).await;
                    continue;
                }
            }

            window.issued.push_back(now);
            window.total += 1;
            if self.config.pause_every > 0
                && !self.config.pause.is_zero()
                && window.total % u64::from(self.config.pause_every) == 0
            {
                window.paused_until = Some(now + self.config.pause);
            }
            return;
        }
    }

    /// 在调度约束下执行请求，瞬时失败按退避策略重试
    ///
    /// 每次尝试都重新排队取得许可；重试次数耗尽后把最后一次错误交给调用方
    pub async fn execute<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = {
                let _permit = self.acquire().await?;
                op().await
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.should_retry_with_error(attempt, &e) => {
                    let backoff = self.retry.calculate_backoff(attempt);
                    warn!(
                        url = %url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    if !backoff.is_zero() {
                        sleep(backoff).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 当前在途请求数
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 运行期间观察到的最大在途请求数
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// 累计发起的请求数（含重试）
    pub fn requests_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "governor_test.rs"]
mod tests;
