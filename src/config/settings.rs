// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::services::capture_service::CaptureOptions;
use crate::domain::services::date_filter::DateRange;
use crate::domain::services::reconcile_service::ReconcileOptions;
use crate::domain::services::report_service::ReportOptions;
use crate::domain::services::scrape_service::ScrapeOptions;
use crate::engines::governor::GovernorConfig;
use crate::utils::errors::SettingsError;
use crate::utils::retry_policy::RetryPolicy;

/// 应用程序配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 运行模式
    pub mode: RunMode,
    /// 是否输出 JSON 格式日志
    pub log_json: bool,
    /// 变更源配置
    pub source: SourceSettings,
    /// 日期与版本过滤配置
    pub filter: FilterSettings,
    /// 调度器配置
    pub governor: GovernorSettings,
    /// 抓取配置
    pub capture: CaptureSettings,
    /// 报告配置
    pub report: ReportSettings,
    /// 对账配置
    pub reconcile: ReconcileSettings,
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 在线抓取：编排、抓取、报告
    Monitor,
    /// 用元数据与批量归档对账
    Reconcile,
}

/// 变更源配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// API 根地址
    pub base_url: String,
    /// 访问令牌
    pub api_token: Option<String>,
    /// 分页请求之间的间隔（毫秒）
    pub page_delay_ms: u64,
    /// 单个请求超时时间（秒）
    pub request_timeout_secs: u64,
}

/// 过滤配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    /// 区间下界：时间戳、日期或"多少小时之前"
    pub after: Option<String>,
    /// 区间上界，格式同 `after`
    pub before: Option<String>,
    pub skip_error_versions: bool,
    pub latest_version_only: bool,
}

/// 调度器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct GovernorSettings {
    pub max_concurrency: usize,
    /// 0 表示不限速
    pub requests_per_minute: u32,
    /// 0 表示不暂停
    pub pause_every: u32,
    pub pause_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    pub save_content: bool,
    pub save_diffs: bool,
    /// 内容、差异、元数据与报告的输出目录
    pub output_dir: String,
}

/// 报告配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    pub group_prefix: String,
    pub default_group: String,
    pub errors_group: String,
    pub include_unchanged: bool,
}

/// 对账配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileSettings {
    pub threshold_minutes: i64,
    pub include_unmatched: bool,
    /// 元数据文件，缺省为输出目录下的 `versions.jsonl`
    pub metadata_path: Option<String>,
    /// 批量归档根目录，缺省为输出目录下的 `archives`
    pub archive_dir: Option<String>,
}

/// 校验后的运行参数
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub mode: RunMode,
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub scrape: ScrapeOptions,
    pub governor: GovernorConfig,
    pub retry: RetryPolicy,
    pub capture: CaptureOptions,
    pub report: ReportOptions,
    pub reconcile: ReconcileOptions,
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub archive_dir: PathBuf,
}

impl Settings {
    /// 带全部默认值的配置构建器
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("mode", "monitor")?
            .set_default("log_json", false)?
            // Default source settings
            .set_default("source.base_url", "http://localhost:3000/api/v0/")?
            .set_default("source.page_delay_ms", 0)?
            .set_default("source.request_timeout_secs", 30)?
            // Default filter settings
            .set_default("filter.skip_error_versions", false)?
            .set_default("filter.latest_version_only", false)?
            // Default governor settings
            .set_default("governor.max_concurrency", 3)?
            .set_default("governor.requests_per_minute", 60)?
            .set_default("governor.pause_every", 0)?
            .set_default("governor.pause_ms", 0)?
            .set_default("governor.max_attempts", 3)?
            .set_default("governor.initial_backoff_ms", 1000)?
            // Default capture settings
            .set_default("capture.save_content", false)?
            .set_default("capture.save_diffs", false)?
            .set_default("capture.output_dir", "./output")?
            // Default report settings
            .set_default("report.group_prefix", "site:")?
            .set_default("report.default_group", "no group")?
            .set_default("report.errors_group", "errors")?
            .set_default("report.include_unchanged", true)?
            // Default reconcile settings
            .set_default("reconcile.threshold_minutes", 30)?
            .set_default("reconcile.include_unmatched", false)
    }

    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}` 与
    /// `VERSIONWATCH__` 前缀的环境变量
    pub fn new() -> Result<Self, SettingsError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("VERSIONWATCH").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// 校验并转换为运行参数
    ///
    /// 所有配置错误在发起任何网络请求之前暴露
    pub fn into_options(self) -> Result<RuntimeOptions, SettingsError> {
        self.into_options_at(Utc::now())
    }

    /// 以给定的当前时间解析相对日期
    pub fn into_options_at(self, now: DateTime<Utc>) -> Result<RuntimeOptions, SettingsError> {
        let api_token = self
            .source
            .api_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if self.mode == RunMode::Monitor && api_token.is_none() {
            return Err(SettingsError::MissingCredentials);
        }
        url::Url::parse(&self.source.base_url).map_err(|e| {
            SettingsError::InvalidValue(format!("source.base_url {}: {}", self.source.base_url, e))
        })?;

        let after = parse_bound(self.filter.after.as_deref(), now)?;
        let before = parse_bound(self.filter.before.as_deref(), now)?;
        if let (Some(after), Some(before)) = (after, before) {
            if after >= before {
                return Err(SettingsError::InvalidDate(format!(
                    "after ({}) must be earlier than before ({})",
                    after, before
                )));
            }
        }

        if self.governor.max_concurrency == 0 {
            return Err(SettingsError::InvalidValue(
                "governor.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.governor.max_attempts == 0 {
            return Err(SettingsError::InvalidValue(
                "governor.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.reconcile.threshold_minutes <= 0 {
            return Err(SettingsError::InvalidValue(
                "reconcile.threshold_minutes must be positive".to_string(),
            ));
        }

        let output_dir = PathBuf::from(&self.capture.output_dir);
        let metadata_path = self
            .reconcile
            .metadata_path
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("versions.jsonl"));
        let archive_dir = self
            .reconcile
            .archive_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("archives"));

        Ok(RuntimeOptions {
            mode: self.mode,
            base_url: self.source.base_url,
            api_token,
            request_timeout: Duration::from_secs(self.source.request_timeout_secs),
            scrape: ScrapeOptions {
                range: DateRange::new(after, before),
                skip_error_versions: self.filter.skip_error_versions,
                latest_version_only: self.filter.latest_version_only,
                page_delay: Duration::from_millis(self.source.page_delay_ms),
            },
            governor: GovernorConfig {
                max_concurrency: self.governor.max_concurrency,
                requests_per_window: self.governor.requests_per_minute,
                window: Duration::from_secs(60),
                pause_every: self.governor.pause_every,
                pause: Duration::from_millis(self.governor.pause_ms),
            },
            retry: RetryPolicy::new(
                self.governor.max_attempts,
                Duration::from_millis(self.governor.initial_backoff_ms),
            ),
            capture: CaptureOptions {
                skip_error_versions: self.filter.skip_error_versions,
                save_content: self.capture.save_content,
                save_diffs: self.capture.save_diffs,
                ..CaptureOptions::default()
            },
            report: ReportOptions {
                group_prefix: self.report.group_prefix,
                default_group: self.report.default_group,
                errors_group: self.report.errors_group,
                include_unchanged: self.report.include_unchanged,
            },
            reconcile: ReconcileOptions {
                threshold: TimeDelta::minutes(self.reconcile.threshold_minutes),
                include_unmatched: self.reconcile.include_unmatched,
            },
            output_dir,
            metadata_path,
            archive_dir,
        })
    }
}

/// 解析日期边界
///
/// 接受 RFC 3339 时间戳、`YYYY-MM-DD`（按 UTC 零点）或表示"多少小时之前"的数字
pub fn parse_bound(
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, SettingsError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| SettingsError::InvalidDate(raw.to_string()))?;
        return Ok(Some(midnight.and_utc()));
    }
    if let Ok(hours) = raw.parse::<f64>() {
        if hours.is_finite() && hours >= 0.0 {
            let offset = TimeDelta::try_milliseconds((hours * 3_600_000.0) as i64)
                .ok_or_else(|| SettingsError::InvalidDate(raw.to_string()))?;
            return now
                .checked_sub_signed(offset)
                .map(Some)
                .ok_or_else(|| SettingsError::InvalidDate(raw.to_string()));
        }
    }

    Err(SettingsError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
