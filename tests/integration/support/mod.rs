// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 集成测试共用的配置与数据构造

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use versionwatch::config::settings::{RuntimeOptions, Settings};

pub const TOKEN: &str = "test-token";

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, hour, minute, 0).unwrap()
}

/// 指向 mock 服务器与临时输出目录的运行参数
pub fn options(base_url: &str, output: &Path, overrides: &[(&str, &str)]) -> RuntimeOptions {
    let mut builder = Settings::defaults()
        .unwrap()
        .set_override("source.base_url", base_url)
        .unwrap()
        .set_override("source.api_token", TOKEN)
        .unwrap()
        .set_override("capture.output_dir", output.to_string_lossy().to_string())
        .unwrap()
        .set_override("governor.initial_backoff_ms", 1)
        .unwrap()
        .set_override("governor.requests_per_minute", 0)
        .unwrap();
    for (key, value) in overrides {
        builder = builder.set_override(*key, *value).unwrap();
    }
    let settings: Settings = builder.build().unwrap().try_deserialize().unwrap();
    settings.into_options_at(at(20, 0, 0)).unwrap()
}

pub fn listing(data: Value, next: Option<String>) -> Value {
    json!({ "data": data, "links": { "next": next } })
}

pub fn remote_version(base: &str, id: &str, date: &str, error_code: Option<u16>) -> Value {
    json!({
        "id": id,
        "date": date,
        "has_content": true,
        "error_code": error_code,
        "content_url": format!("{}/content/{}", base, id),
        "diff_url": format!("{}/diff/{}", base, id),
        "diff_safe_url": format!("{}/diff-safe/{}", base, id),
    })
}
