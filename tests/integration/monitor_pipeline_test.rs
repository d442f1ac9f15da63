// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use versionwatch::application::use_cases::monitor_use_case::MonitorUseCase;
use versionwatch::domain::repositories::storage_repository::StorageRepository;
use versionwatch::engines::http_source::HttpChangeSource;
use versionwatch::infrastructure::metadata;
use versionwatch::infrastructure::storage::LocalStorage;
use versionwatch::utils::hashing;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::{at, listing, options, remote_version, TOKEN};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_body(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

/// 一个站点、两个页面：p1 正常，p2 的版本列表已被删除
async fn monitored_source(server: &MockServer) {
    let base = server.uri();
    mount_json(
        server,
        "/api/sites",
        listing(
            json!([{ "id": "s1", "name": "EPA - epa.gov", "url": "https://epa.gov" }]),
            None,
        ),
    )
    .await;
    mount_json(
        server,
        "/api/sites/s1/pages",
        listing(
            json!([
                { "id": "p1", "url": "https://epa.gov/air", "title": "Air",
                  "tags": ["site:Air"], "view_url": format!("{}/view/p1", base) },
                { "id": "p2", "url": "https://epa.gov/gone" },
                { "id": "p3", "url": "https://epa.gov/empty", "total_versions": 0 }
            ]),
            None,
        ),
    )
    .await;
    mount_json(
        server,
        "/api/pages/p1/versions",
        listing(
            json!([
                remote_version(&base, "v2", "2020-01-05T00:00:00Z", None),
                remote_version(&base, "v1", "2020-01-01T00:00:00Z", None),
                { "id": "undated", "has_content": true }
            ]),
            None,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/pages/p2/versions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    for id in ["v1", "v2"] {
        mount_body(server, &format!("/content/{}", id), &format!("<html>{}</html>", id)).await;
        mount_body(server, &format!("/diff/{}", id), &format!("<ins>{}</ins>", id)).await;
    }
}

#[tokio::test]
async fn test_monitor_run_writes_metadata_content_and_report() {
    let server = MockServer::start().await;
    monitored_source(&server).await;
    let output = tempfile::tempdir().unwrap();
    let options = options(
        &format!("{}/api", server.uri()),
        output.path(),
        &[("capture.save_content", "true")],
    );

    let source = Arc::new(
        HttpChangeSource::new(&options.base_url, TOKEN, Duration::from_secs(5)).unwrap(),
    );
    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(&options.output_dir));
    let use_case = MonitorUseCase::new(source, storage, &options);

    let outcome = use_case.run(at(20, 0, 0)).await.unwrap();

    // p2 已删除、p3 确定为空，都不进入结果，也不计为失败
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    let ids: Vec<&str> = record.versions.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v2"]);
    assert_eq!(use_case.summary().failure_count(), 0);

    let v2 = &record.versions[1];
    assert_eq!(v2.content_hash, Some(hashing::sha256_hex(b"<html>v2</html>")));
    assert!(v2.diff_hash.is_some());
    assert!(v2.text_diff_hash.is_some());
    assert!(output.path().join("s1/p1/v2.html").exists());

    let written = metadata::read_versions(&options.metadata_path).await.unwrap();
    assert_eq!(written, record.versions);

    let rows = outcome.report.group("Air").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].version_id, "v2");
    assert_eq!(rows[0].maintainers, "EPA");
    assert_eq!(
        rows[0].diff_from_earliest_url.as_deref(),
        Some(format!("{}/view/p1/v2:v1", server.uri()).as_str())
    );

    let csv = std::fs::read_to_string(output.path().join("reports/Air.csv")).unwrap();
    assert!(csv.starts_with("Index,Version ID"));
    assert!(csv.contains("\r\n1,v2,"));
}

#[tokio::test]
async fn test_capture_failures_do_not_abort_the_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_json(
        &server,
        "/api/sites",
        listing(json!([{ "id": "s1", "name": "EPA", "url": "https://epa.gov" }]), None),
    )
    .await;
    mount_json(
        &server,
        "/api/sites/s1/pages",
        listing(json!([{ "id": "p1", "url": "https://epa.gov/air" }]), None),
    )
    .await;
    mount_json(
        &server,
        "/api/pages/p1/versions",
        listing(
            json!([
                remote_version(&base, "v1", "2020-01-01T00:00:00Z", None),
                remote_version(&base, "v2", "2020-01-02T00:00:00Z", None)
            ]),
            None,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/content/v1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_body(&server, "/content/v2", "<html>v2</html>").await;
    mount_body(&server, "/diff/v1", "d1").await;
    mount_body(&server, "/diff/v2", "d2").await;

    let output = tempfile::tempdir().unwrap();
    let options = options(&format!("{}/api", base), output.path(), &[]);
    let source = Arc::new(
        HttpChangeSource::new(&options.base_url, TOKEN, Duration::from_secs(5)).unwrap(),
    );
    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(&options.output_dir));
    let use_case = MonitorUseCase::new(source, storage, &options);

    let outcome = use_case.run(at(20, 0, 0)).await.unwrap();

    let versions = &outcome.records[0].versions;
    assert!(versions[0].content_hash.is_none());
    assert!(versions[0].diff_hash.is_some());
    assert!(versions[1].content_hash.is_some());
    assert_eq!(use_case.summary().failure_count(), 1);
    // 未开启保存时不写内容文件
    assert!(!output.path().join("s1/p1/v2.html").exists());
}
