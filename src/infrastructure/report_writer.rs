// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing::info;

use crate::domain::models::report::{Report, ReportRow, REPORT_COLUMNS};
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_line<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line: Vec<String> = fields.into_iter().map(escape).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// 把一个分组渲染为带表头的 CSV
pub fn render_csv(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    push_line(&mut out, REPORT_COLUMNS);
    for row in rows {
        let record = row.to_record();
        push_line(&mut out, record.iter().map(String::as_str));
    }
    out
}

/// 分组名转为文件名
pub fn file_name_for(group: &str) -> String {
    let slug: String = group
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "group.csv".to_string()
    } else {
        format!("{}.csv", slug)
    }
}

/// 每个分组写出一份报告，返回写入位置
pub async fn write_report(
    storage: &dyn StorageRepository,
    prefix: &str,
    report: &Report,
) -> Result<Vec<String>, StorageError> {
    let mut written = Vec::with_capacity(report.groups.len());
    for (group, rows) in &report.groups {
        let key = format!("{}/{}", prefix.trim_end_matches('/'), file_name_for(group));
        let location = storage.save(&key, render_csv(rows).as_bytes()).await?;
        info!(group = %group, rows = rows.len(), location = %location, "Report written");
        written.push(location);
    }
    Ok(written)
}
